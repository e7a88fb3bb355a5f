// tests/http_adapter_tests.rs
mod common;

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::{DateTime, Utc};
use common::setup_tracing;
use kopi_checkout::gateway::http::{HttpPaymentGateway, ProxyImageFetcher};
use kopi_checkout::{
  CheckoutError, CreatePaymentOutcome, CreatePaymentRequest, GatewayRejection, ImageFetcher, PaymentGateway,
  PaymentStatus, PaymentStatusOutcome,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

// --- Stub of the app's /api routes ---

async fn stub_create(body: web::Json<Value>) -> HttpResponse {
  let order_id = body["order_id"].as_str().unwrap_or_default().to_string();
  if body["amount"] != 15000 || body["customer_name"] != "Budi" || body["customer_phone"] != "08123456789" {
    return HttpResponse::BadRequest().json(json!({ "success": false, "error": "unexpected request body" }));
  }
  match order_id.as_str() {
    "ord_rejected" => HttpResponse::UnprocessableEntity().json(json!({ "success": false, "error": "Amount below minimum" })),
    "ord_html" => HttpResponse::BadGateway()
      .content_type("text/html")
      .body("<html><body>502 Bad Gateway</body></html>"),
    "ord_partial" => HttpResponse::Ok().json(json!({ "success": true, "qris_url": "https://qr.example.com/x.png" })),
    _ => HttpResponse::Ok().json(json!({
      "success": true,
      "qris_url": format!("https://qr.example.com/{order_id}.png"),
      "transaction_id": format!("tx_{order_id}"),
      "expires_at": "2030-01-01T00:15:00Z",
      "merchant": "Kopi Kita",
    })),
  }
}

async fn stub_status(query: web::Query<HashMap<String, String>>) -> HttpResponse {
  match query.get("transaction_id").map(String::as_str) {
    Some("tx_paid") => HttpResponse::Ok().json(json!({ "success": true, "status": "paid", "transaction_id": "tx_paid" })),
    Some("tx_gone") => HttpResponse::NotFound().json(json!({ "success": false, "error": "Transaction not found" })),
    Some(other) => HttpResponse::Ok().json(json!({ "success": true, "status": "pending", "transaction_id": other })),
    None => HttpResponse::BadRequest().json(json!({ "success": false, "error": "transaction_id is required" })),
  }
}

async fn stub_image(query: web::Query<HashMap<String, String>>) -> HttpResponse {
  let url = query.get("url").cloned().unwrap_or_default();
  if url.contains("missing") {
    return HttpResponse::InternalServerError().json(json!({ "error": "Failed to fetch image" }));
  }
  if url.contains("slow") {
    actix_web::rt::time::sleep(Duration::from_secs(2)).await;
  }
  HttpResponse::Ok().content_type("image/jpeg").body(vec![0xFF, 0xD8, 0xFF])
}

async fn start_stub() -> (String, ServerHandle) {
  let server = HttpServer::new(|| {
    App::new()
      .route("/api/qris/create", web::post().to(stub_create))
      .route("/api/qris/status", web::get().to(stub_status))
      .route("/api/proxy-image", web::get().to(stub_image))
  })
  .workers(1)
  .bind(("127.0.0.1", 0))
  .expect("bind stub server");
  let addr = server.addrs()[0];
  let server = server.run();
  let handle = server.handle();
  actix_web::rt::spawn(server);
  (format!("http://{}/", addr), handle)
}

fn request(order_id: &str) -> CreatePaymentRequest {
  CreatePaymentRequest {
    amount: 15000,
    order_id: order_id.to_string(),
    customer_name: "Budi".to_string(),
    customer_phone: Some("08123456789".to_string()),
  }
}

fn gateway(base: &str) -> HttpPaymentGateway {
  HttpPaymentGateway::new(base, Duration::from_secs(5)).expect("client builds")
}

// --- Payment gateway ---

#[actix_web::test]
async fn test_create_decodes_success_body() {
  setup_tracing();
  let (base, server) = start_stub().await;

  let outcome = gateway(&base).create_payment(request("ord_1")).await.expect("request completes");
  match outcome {
    CreatePaymentOutcome::Created(data) => {
      assert_eq!(data.transaction_id, "tx_ord_1");
      assert_eq!(data.qris_url, "https://qr.example.com/ord_1.png");
      let expected: DateTime<Utc> = "2030-01-01T00:15:00Z".parse().expect("valid timestamp");
      assert_eq!(data.expires_at, expected);
    }
    other => panic!("expected Created, got {other:?}"),
  }
  server.stop(true).await;
}

#[actix_web::test]
async fn test_create_rejection_keeps_status_and_message() {
  setup_tracing();
  let (base, server) = start_stub().await;

  let outcome = gateway(&base).create_payment(request("ord_rejected")).await.expect("request completes");
  assert_eq!(
    outcome,
    CreatePaymentOutcome::Rejected(GatewayRejection {
      code: Some(422),
      message: "Amount below minimum".to_string(),
    })
  );
  server.stop(true).await;
}

#[actix_web::test]
async fn test_create_non_json_error_page_keeps_status() {
  setup_tracing();
  let (base, server) = start_stub().await;

  let outcome = gateway(&base).create_payment(request("ord_html")).await.expect("request completes");
  assert_eq!(
    outcome,
    CreatePaymentOutcome::Rejected(GatewayRejection {
      code: Some(502),
      message: "Failed to create QRIS payment".to_string(),
    })
  );
  server.stop(true).await;
}

#[actix_web::test]
async fn test_create_partial_success_body_is_rejected() {
  setup_tracing();
  let (base, server) = start_stub().await;

  match gateway(&base).create_payment(request("ord_partial")).await.expect("request completes") {
    CreatePaymentOutcome::Rejected(rejection) => {
      assert_eq!(rejection.code, Some(200));
      assert!(rejection.message.starts_with("Malformed payment response"));
    }
    other => panic!("expected Rejected, got {other:?}"),
  }
  server.stop(true).await;
}

#[actix_web::test]
async fn test_status_sends_transaction_id_and_decodes_status() {
  setup_tracing();
  let (base, server) = start_stub().await;
  let gateway = gateway(&base);

  assert_eq!(
    gateway.check_status("tx_paid").await.expect("request completes"),
    PaymentStatusOutcome::Reported(PaymentStatus::Paid)
  );
  assert_eq!(
    gateway.check_status("tx_other").await.expect("request completes"),
    PaymentStatusOutcome::Reported(PaymentStatus::Pending)
  );
  assert_eq!(
    gateway.check_status("tx_gone").await.expect("request completes"),
    PaymentStatusOutcome::Rejected(GatewayRejection {
      code: Some(404),
      message: "Transaction not found".to_string(),
    })
  );
  server.stop(true).await;
}

#[actix_web::test]
async fn test_unreachable_gateway_is_a_transport_error() {
  setup_tracing();
  let (base, server) = start_stub().await;
  server.stop(true).await;

  let result = gateway(&base).create_payment(request("ord_1")).await;
  assert!(matches!(result, Err(CheckoutError::Http(_))), "got {result:?}");
}

// --- Image proxy ---

#[actix_web::test]
async fn test_image_fetch_returns_bytes_and_content_type() {
  setup_tracing();
  let (base, server) = start_stub().await;
  let fetcher = ProxyImageFetcher::new(&base, Duration::from_secs(5)).expect("client builds");

  let image = fetcher.fetch("https://qr.example.com/tx_1.png").await.expect("image fetched");
  assert_eq!(image.bytes, vec![0xFF, 0xD8, 0xFF]);
  assert_eq!(image.content_type, "image/jpeg");
  server.stop(true).await;
}

#[actix_web::test]
async fn test_image_fetch_error_status_is_gateway_error() {
  setup_tracing();
  let (base, server) = start_stub().await;
  let fetcher = ProxyImageFetcher::new(&base, Duration::from_secs(5)).expect("client builds");

  let result = fetcher.fetch("https://qr.example.com/missing.png").await;
  assert!(matches!(result, Err(CheckoutError::Gateway { .. })), "got {result:?}");
  server.stop(true).await;
}

#[actix_web::test]
async fn test_image_fetch_honours_client_timeout() {
  setup_tracing();
  let (base, server) = start_stub().await;
  let fetcher = ProxyImageFetcher::new(&base, Duration::from_millis(200)).expect("client builds");

  let result = fetcher.fetch("https://qr.example.com/slow.png").await;
  match result {
    Err(CheckoutError::Http(e)) => assert!(e.is_timeout()),
    other => panic!("expected a timeout, got {other:?}"),
  }
  server.stop(false).await;
}
