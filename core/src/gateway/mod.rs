// core/src/gateway/mod.rs

//! Typed payloads for the QRIS payment routes, shared by the server-side
//! proxy and the client-side gateway adapter.

pub mod http;

use crate::error::CheckoutResult;
use crate::order::Amount;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One QR payment session. Replaced wholesale on a fresh create, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrisData {
  pub qris_url: String,
  pub transaction_id: String,
  pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
  pub amount: Amount,
  pub order_id: String,
  pub customer_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub customer_phone: Option<String>,
}

/// A `{success: false, error}` answer, with the HTTP status when one was seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRejection {
  pub code: Option<u16>,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreatePaymentOutcome {
  Created(QrisData),
  Rejected(GatewayRejection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatus {
  Paid,
  Pending,
  Other(String),
}

impl From<&str> for PaymentStatus {
  fn from(value: &str) -> Self {
    match value {
      "paid" => PaymentStatus::Paid,
      "pending" => PaymentStatus::Pending,
      other => PaymentStatus::Other(other.to_string()),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentStatusOutcome {
  Reported(PaymentStatus),
  Rejected(GatewayRejection),
}

fn rejection_from(code: Option<u16>, body: &Value, fallback: &str) -> GatewayRejection {
  let message = body
    .get("error")
    .or_else(|| body.get("message"))
    .and_then(Value::as_str)
    .unwrap_or(fallback)
    .to_string();
  GatewayRejection { code, message }
}

fn reports_failure(body: &Value) -> bool {
  body.get("success").and_then(Value::as_bool) == Some(false)
}

impl CreatePaymentOutcome {
  /// Validates a `/api/qris/create` response body before anything branches on it.
  pub fn from_response(code: u16, body: &Value) -> Self {
    if !(200..300).contains(&code) || reports_failure(body) {
      return CreatePaymentOutcome::Rejected(rejection_from(Some(code), body, "Failed to create QRIS payment"));
    }
    match QrisData::deserialize(body) {
      Ok(data) => CreatePaymentOutcome::Created(data),
      Err(e) => CreatePaymentOutcome::Rejected(GatewayRejection {
        code: Some(code),
        message: format!("Malformed payment response: {e}"),
      }),
    }
  }
}

impl PaymentStatusOutcome {
  /// Validates a `/api/qris/status` response body.
  pub fn from_response(code: u16, body: &Value) -> Self {
    let status = body.get("status").and_then(Value::as_str);
    if !(200..300).contains(&code) || reports_failure(body) {
      let fallback = status.unwrap_or("Failed to check payment status");
      return PaymentStatusOutcome::Rejected(rejection_from(Some(code), body, fallback));
    }
    match status {
      Some(status) => PaymentStatusOutcome::Reported(PaymentStatus::from(status)),
      None => PaymentStatusOutcome::Rejected(GatewayRejection {
        code: Some(code),
        message: "Payment status missing from response".to_string(),
      }),
    }
  }
}

/// The client's view of the QRIS payment proxy.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_payment(&self, request: CreatePaymentRequest) -> CheckoutResult<CreatePaymentOutcome>;

  async fn check_status(&self, transaction_id: &str) -> CheckoutResult<PaymentStatusOutcome>;
}
