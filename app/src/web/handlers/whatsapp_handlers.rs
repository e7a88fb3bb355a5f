// app/src/web/handlers/whatsapp_handlers.rs

use actix_web::web::Bytes;
use actix_web::{web, HttpResponse, ResponseError};
use kopi_checkout::messages::NotificationEvent;
use kopi_checkout::phone::{format_phone_number, validate_phone_number};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::errors::{AppError, Result as AppResult};
use crate::state::AppState;
use crate::web::auth::AdminUser;

// --- Request DTOs ---

#[derive(Deserialize, Debug, Default)]
pub struct SendMessagePayload {
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub message: String,
}

#[derive(Deserialize, Debug)]
pub struct NotifyPayload {
  #[serde(default)]
  pub phone: String,
  #[serde(default)]
  pub customer_name: String,
  #[serde(default)]
  pub order_id: String,
  #[serde(flatten)]
  pub event: NotificationEvent,
}

fn canonical_phone(raw: &str) -> AppResult<String> {
  let phone = format_phone_number(raw);
  if validate_phone_number(&phone) {
    Ok(phone)
  } else {
    Err(AppError::Validation(
      "Invalid phone number. Use an Indonesian number such as 08123456789.".to_string(),
    ))
  }
}

/// Bodies are decoded only after `AdminUser` resolved, so callers without
/// admin rights never see body validation details.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
  serde_json::from_slice(body).map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

// --- Handlers ---

#[instrument(name = "handler::whatsapp_send", skip(app_state, body, admin), fields(admin_id = %admin.0.id))]
pub async fn send_message_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  body: Bytes,
) -> AppResult<HttpResponse> {
  let payload: SendMessagePayload = decode_body(&body)?;
  let phone = canonical_phone(&payload.phone)?;
  if payload.message.trim().is_empty() {
    return Err(AppError::Validation("message is required".to_string()));
  }

  let data = app_state.messaging.send_message(&phone, &payload.message).await?;
  info!("Admin message sent.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "data": data })))
}

/// Builds the customer message for an order event and sends it.
#[instrument(name = "handler::whatsapp_notify", skip(app_state, body, admin), fields(admin_id = %admin.0.id))]
pub async fn notify_customer_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  body: Bytes,
) -> AppResult<HttpResponse> {
  let payload: NotifyPayload = decode_body(&body)?;
  let phone = canonical_phone(&payload.phone)?;
  if payload.order_id.trim().is_empty() {
    return Err(AppError::Validation("order_id is required".to_string()));
  }

  let message = payload.event.render(payload.customer_name.trim(), payload.order_id.trim());
  let data = app_state.messaging.send_message(&phone, &message).await?;
  info!(order_id = %payload.order_id, "Customer notified.");
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": message, "data": data })))
}

/// Failures keep the `connected: false` field so the admin screen can render the unlinked state.
#[instrument(name = "handler::whatsapp_qr", skip(app_state, _admin))]
pub async fn connection_qr_handler(app_state: web::Data<AppState>, _admin: AdminUser) -> HttpResponse {
  match app_state.messaging.connection().await {
    Ok(connection) => HttpResponse::Ok().json(connection),
    Err(e) => {
      warn!(error = %e, "WhatsApp connection status unavailable.");
      HttpResponse::build(e.status_code()).json(json!({
        "success": false,
        "connected": false,
        "error": e.public_message(),
      }))
    }
  }
}

#[instrument(name = "handler::whatsapp_logout", skip(app_state, admin), fields(admin_id = %admin.0.id))]
pub async fn logout_handler(app_state: web::Data<AppState>, admin: AdminUser) -> AppResult<HttpResponse> {
  let body = app_state.messaging.logout().await?;
  Ok(HttpResponse::Ok().json(body))
}
