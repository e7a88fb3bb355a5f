// app/src/services/qris_provider.rs

use super::{read_provider_json, ProviderPayload, PROVIDER_TIMEOUT};
use crate::config::QrisCredentials;
use crate::errors::{AppError, Result as AppResult};
use async_trait::async_trait;
use kopi_checkout::{Amount, CreatePaymentRequest, QrisData};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub type CreatedPayment = ProviderPayload<QrisData>;
pub type PaymentStatusReply = ProviderPayload<PaymentStatusReport>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
  pub status: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub transaction_id: Option<String>,
}

#[async_trait]
pub trait QrisProvider: Send + Sync {
  async fn create_payment(&self, request: &CreatePaymentRequest) -> AppResult<CreatedPayment>;

  async fn check_status(&self, transaction_id: &str) -> AppResult<PaymentStatusReply>;
}

#[derive(Debug, Serialize)]
struct ProviderCreateBody<'a> {
  amount: Amount,
  order_id: &'a str,
  customer_name: &'a str,
  #[serde(skip_serializing_if = "Option::is_none")]
  customer_phone: Option<&'a str>,
  #[serde(skip_serializing_if = "Option::is_none")]
  callback_url: Option<&'a str>,
}

/// Talks to the QRIS provider with server-held credentials.
pub struct HttpQrisProvider {
  client: reqwest::Client,
  credentials: Option<QrisCredentials>,
  callback_url: Option<String>,
}

impl HttpQrisProvider {
  pub fn new(client: reqwest::Client, credentials: Option<QrisCredentials>, callback_url: Option<String>) -> Self {
    Self {
      client,
      credentials,
      callback_url,
    }
  }

  fn credentials(&self) -> AppResult<&QrisCredentials> {
    self
      .credentials
      .as_ref()
      .ok_or_else(|| AppError::Config("QRIS_API_URL, QRIS_API_KEY and QRIS_API_SECRET must be set".to_string()))
  }
}

#[async_trait]
impl QrisProvider for HttpQrisProvider {
  #[instrument(name = "qris_provider::create_payment", skip(self, request), fields(order_id = %request.order_id, amount = request.amount))]
  async fn create_payment(&self, request: &CreatePaymentRequest) -> AppResult<CreatedPayment> {
    let creds = self.credentials()?;
    let body = ProviderCreateBody {
      amount: request.amount,
      order_id: &request.order_id,
      customer_name: &request.customer_name,
      customer_phone: request.customer_phone.as_deref(),
      callback_url: self.callback_url.as_deref(),
    };

    let response = self
      .client
      .post(format!("{}/payments", creds.base_url))
      .header("X-API-Key", creds.api_key.expose())
      .header("X-API-Secret", creds.api_secret.expose())
      .timeout(PROVIDER_TIMEOUT)
      .json(&body)
      .send()
      .await?;

    let created = CreatedPayment::parse(read_provider_json(response).await?)?;
    info!(transaction_id = %created.data.transaction_id, expires_at = %created.data.expires_at, "QRIS payment created.");
    Ok(created)
  }

  #[instrument(name = "qris_provider::check_status", skip(self))]
  async fn check_status(&self, transaction_id: &str) -> AppResult<PaymentStatusReply> {
    let creds = self.credentials()?;
    let response = self
      .client
      .get(format!("{}/payments/{}/status", creds.base_url, transaction_id))
      .header("X-API-Key", creds.api_key.expose())
      .header("X-API-Secret", creds.api_secret.expose())
      .timeout(PROVIDER_TIMEOUT)
      .send()
      .await?;

    let mut reply = PaymentStatusReply::parse(read_provider_json(response).await?)?;
    reply.data.transaction_id.get_or_insert_with(|| transaction_id.to_string());
    info!(status = %reply.data.status, "QRIS payment status fetched.");
    Ok(reply)
  }
}
