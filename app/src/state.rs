// app/src/state.rs
use crate::config::AppConfig;
use crate::errors::Result as AppResult;
use crate::services::messaging_provider::{HttpMessagingProvider, MessagingProvider};
use crate::services::qris_provider::{HttpQrisProvider, QrisProvider};
use crate::services::session_backend::{HttpSessionBackend, SessionBackend};
use crate::web::handlers::image_handlers::image_redirect_policy;
use anyhow::Context;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  /// Client for pass-through fetches such as the image proxy.
  pub http_client: reqwest::Client,
  pub qris: Arc<dyn QrisProvider>,
  pub messaging: Arc<dyn MessagingProvider>,
  pub sessions: Arc<dyn SessionBackend>,
}

impl AppState {
  /// Wires the HTTP-backed providers from configuration.
  pub fn from_config(config: Arc<AppConfig>) -> AppResult<Self> {
    let provider_client = reqwest::Client::builder()
      .user_agent(concat!("kopi_app/", env!("CARGO_PKG_VERSION")))
      .build()
      .context("failed to build outbound HTTP client")?;
    let http_client = reqwest::Client::builder()
      .user_agent(concat!("kopi_app/", env!("CARGO_PKG_VERSION")))
      .redirect(image_redirect_policy(config.proxy_image_hosts.clone()))
      .build()
      .context("failed to build image proxy HTTP client")?;

    Ok(Self {
      qris: Arc::new(HttpQrisProvider::new(
        provider_client.clone(),
        config.qris.clone(),
        config.qris_callback_url(),
      )),
      messaging: Arc::new(HttpMessagingProvider::new(
        provider_client.clone(),
        config.whatsapp_api_url.clone(),
      )),
      sessions: Arc::new(HttpSessionBackend::new(
        provider_client,
        config.session_backend.clone(),
      )),
      http_client,
      config,
    })
  }
}
