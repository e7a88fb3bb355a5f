// app/src/services/messaging_provider.rs

use super::{read_provider_json, PROVIDER_TIMEOUT};
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

/// Link state of the WhatsApp gateway session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhatsappConnection {
  #[serde(default)]
  pub connected: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub qr: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
}

#[async_trait]
pub trait MessagingProvider: Send + Sync {
  /// `phone` is already canonical (`62...`).
  async fn send_message(&self, phone: &str, message: &str) -> AppResult<Value>;

  async fn connection(&self) -> AppResult<WhatsappConnection>;

  async fn logout(&self) -> AppResult<Value>;
}

pub struct HttpMessagingProvider {
  client: reqwest::Client,
  base_url: Option<String>,
}

impl HttpMessagingProvider {
  pub fn new(client: reqwest::Client, base_url: Option<String>) -> Self {
    Self { client, base_url }
  }

  fn endpoint(&self, path: &str) -> AppResult<String> {
    self
      .base_url
      .as_ref()
      .map(|base| format!("{}{}", base, path))
      .ok_or_else(|| AppError::Config("WHATSAPP_API_URL must be set".to_string()))
  }
}

#[async_trait]
impl MessagingProvider for HttpMessagingProvider {
  #[instrument(name = "messaging_provider::send", skip(self, message), fields(message_len = message.len()))]
  async fn send_message(&self, phone: &str, message: &str) -> AppResult<Value> {
    let response = self
      .client
      .post(self.endpoint("/send")?)
      .timeout(PROVIDER_TIMEOUT)
      .json(&json!({ "phone": phone, "message": message }))
      .send()
      .await?;
    let body = read_provider_json(response).await?;
    info!("WhatsApp message accepted by gateway.");
    Ok(body)
  }

  #[instrument(name = "messaging_provider::connection", skip(self))]
  async fn connection(&self) -> AppResult<WhatsappConnection> {
    let response = self
      .client
      .get(self.endpoint("/qr")?)
      .timeout(PROVIDER_TIMEOUT)
      .send()
      .await?;
    let body = read_provider_json(response).await?;
    serde_json::from_value(body).map_err(|e| AppError::UpstreamShape(e.to_string()))
  }

  #[instrument(name = "messaging_provider::logout", skip(self))]
  async fn logout(&self) -> AppResult<Value> {
    let response = self
      .client
      .post(self.endpoint("/logout")?)
      .timeout(PROVIDER_TIMEOUT)
      .send()
      .await?;
    let body = read_provider_json(response).await?;
    info!("WhatsApp gateway session logged out.");
    Ok(body)
  }
}
