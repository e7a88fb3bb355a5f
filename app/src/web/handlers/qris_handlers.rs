// app/src/web/handlers/qris_handlers.rs

use actix_web::{web, HttpResponse};
use kopi_checkout::{Amount, CreatePaymentRequest};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;

// --- Request DTOs ---

/// Every field is optional at the wire level so missing values surface as
/// our own 400 rather than an extractor error.
#[derive(Deserialize, Debug, Default)]
pub struct CreateQrisPayload {
  #[serde(default)]
  pub amount: Option<Amount>,
  #[serde(default)]
  pub order_id: Option<String>,
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub customer_phone: Option<String>,
}

impl CreateQrisPayload {
  fn into_request(self) -> AppResult<CreatePaymentRequest> {
    let order_id = non_empty(self.order_id).ok_or_else(|| AppError::Validation("order_id is required".to_string()))?;
    let customer_name =
      non_empty(self.customer_name).ok_or_else(|| AppError::Validation("customer_name is required".to_string()))?;
    let amount = self
      .amount
      .filter(|a| *a > 0)
      .ok_or_else(|| AppError::Validation("amount must be a positive integer".to_string()))?;

    Ok(CreatePaymentRequest {
      amount,
      order_id,
      customer_name,
      customer_phone: non_empty(self.customer_phone),
    })
  }
}

#[derive(Deserialize, Debug)]
pub struct StatusQuery {
  #[serde(default)]
  pub transaction_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Transaction ids are interpolated into the provider path.
fn valid_transaction_id(id: &str) -> bool {
  id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// --- Handlers ---

#[instrument(name = "handler::qris_create", skip(app_state, payload))]
pub async fn create_qris_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateQrisPayload>,
) -> AppResult<HttpResponse> {
  let request = payload.into_inner().into_request()?;
  info!(order_id = %request.order_id, amount = request.amount, "Creating QRIS payment.");

  let created = app_state.qris.create_payment(&request).await?;
  Ok(HttpResponse::Ok().json(created.into_success_body()))
}

#[instrument(name = "handler::qris_status", skip(app_state, query))]
pub async fn qris_status_handler(
  app_state: web::Data<AppState>,
  query: web::Query<StatusQuery>,
) -> AppResult<HttpResponse> {
  let transaction_id = non_empty(query.into_inner().transaction_id)
    .ok_or_else(|| AppError::Validation("transaction_id is required".to_string()))?;
  if !valid_transaction_id(&transaction_id) {
    return Err(AppError::Validation("transaction_id has invalid characters".to_string()));
  }

  let reply = app_state.qris.check_status(&transaction_id).await?;
  info!(%transaction_id, status = %reply.data.status, "QRIS status checked.");
  Ok(HttpResponse::Ok().json(reply.into_success_body()))
}
