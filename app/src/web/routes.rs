// app/src/web/routes.rs

use crate::errors::AppError;
use crate::web::handlers::{image_handlers, qris_handlers, whatsapp_handlers};
use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  // Malformed bodies and queries answer with the same `{success: false, error}` shape as handler errors.
  cfg
    .app_data(
      web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .app_data(
      web::QueryConfig::default().error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    );

  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      // QRIS payment proxy
      .service(
        web::scope("/qris")
          .route("/create", web::post().to(qris_handlers::create_qris_handler))
          .route("/status", web::get().to(qris_handlers::qris_status_handler)),
      )
      // WhatsApp gateway proxy, admin only
      .service(
        web::scope("/whatsapp")
          .route("/send", web::post().to(whatsapp_handlers::send_message_handler))
          .route("/notify", web::post().to(whatsapp_handlers::notify_customer_handler))
          .route("/qr", web::get().to(whatsapp_handlers::connection_qr_handler))
          .route("/logout", web::post().to(whatsapp_handlers::logout_handler)),
      )
      .route("/proxy-image", web::get().to(image_handlers::proxy_image_handler)),
  );
}
