// core/src/gateway/http.rs

//! Client-side adapters for the app's own `/api/qris/*` and
//! `/api/proxy-image` routes.

use super::{CreatePaymentOutcome, CreatePaymentRequest, PaymentGateway, PaymentStatusOutcome};
use crate::error::{CheckoutError, CheckoutResult};
use crate::ports::{FetchedImage, ImageFetcher};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_IMAGE_TYPE: &str = "image/png";

#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
  client: reqwest::Client,
  base_url: String,
}

impl HttpPaymentGateway {
  /// `base_url` is the app origin, e.g. `https://shop.example`.
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> CheckoutResult<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self::with_client(client, base_url))
  }

  pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url, path)
  }
}

async fn read_json(response: reqwest::Response) -> CheckoutResult<(u16, Value)> {
  let code = response.status().as_u16();
  let bytes = response.bytes().await?;
  // Error pages from intermediaries may not be JSON; keep the status.
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  Ok((code, body))
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
  #[instrument(name = "gateway::create_payment", skip(self, request), fields(order_id = %request.order_id, amount = request.amount))]
  async fn create_payment(&self, request: CreatePaymentRequest) -> CheckoutResult<CreatePaymentOutcome> {
    let response = self.client.post(self.url("/api/qris/create")).json(&request).send().await?;
    let (code, body) = read_json(response).await?;
    debug!(code, "QRIS create responded.");
    Ok(CreatePaymentOutcome::from_response(code, &body))
  }

  #[instrument(name = "gateway::check_status", skip(self))]
  async fn check_status(&self, transaction_id: &str) -> CheckoutResult<PaymentStatusOutcome> {
    let response = self
      .client
      .get(self.url("/api/qris/status"))
      .query(&[("transaction_id", transaction_id)])
      .send()
      .await?;
    let (code, body) = read_json(response).await?;
    debug!(code, "QRIS status responded.");
    Ok(PaymentStatusOutcome::from_response(code, &body))
  }
}

/// Fetches images through `/api/proxy-image` to get around the provider's
/// cross-origin restrictions.
#[derive(Debug, Clone)]
pub struct ProxyImageFetcher {
  client: reqwest::Client,
  base_url: String,
}

impl ProxyImageFetcher {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> CheckoutResult<Self> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self::with_client(client, base_url))
  }

  pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
    Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    }
  }
}

#[async_trait]
impl ImageFetcher for ProxyImageFetcher {
  async fn fetch(&self, url: &str) -> CheckoutResult<FetchedImage> {
    let response = self
      .client
      .get(format!("{}/api/proxy-image", self.base_url))
      .query(&[("url", url)])
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(CheckoutError::Gateway {
        message: format!("Image proxy responded with {}", response.status()),
      });
    }
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .unwrap_or(DEFAULT_IMAGE_TYPE)
      .to_string();
    let bytes = response.bytes().await?.to_vec();
    Ok(FetchedImage { bytes, content_type })
  }
}
