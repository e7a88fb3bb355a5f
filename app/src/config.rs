// app/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;

/// A credential that must never reach logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Secret(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[REDACTED]")
  }
}

impl fmt::Display for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[REDACTED]")
  }
}

#[derive(Debug, Clone)]
pub struct QrisCredentials {
  pub base_url: String,
  pub api_key: Secret,
  pub api_secret: Secret,
}

#[derive(Debug, Clone)]
pub struct SessionBackendConfig {
  pub url: String,
  pub anon_key: Secret,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  /// Public origin of the app, used to build provider callback URLs.
  pub app_public_url: Option<String>,

  pub qris: Option<QrisCredentials>,
  pub whatsapp_api_url: Option<String>,
  pub session_backend: Option<SessionBackendConfig>,
  pub session_cookie: String,

  /// Hosts the image proxy may fetch from. Empty means any public host.
  pub proxy_image_hosts: Vec<String>,
  pub proxy_image_max_bytes: usize,
}

pub const DEFAULT_SESSION_COOKIE: &str = "sb-access-token";
pub const DEFAULT_PROXY_IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok();

    let get_env = |var_name: &str| env::var(var_name).ok().filter(|v| !v.trim().is_empty());

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;

    let qris = match (get_env("QRIS_API_URL"), get_env("QRIS_API_KEY"), get_env("QRIS_API_SECRET")) {
      (Some(base_url), Some(key), Some(secret)) => Some(QrisCredentials {
        base_url: base_url.trim_end_matches('/').to_string(),
        api_key: Secret::new(key),
        api_secret: Secret::new(secret),
      }),
      _ => {
        tracing::warn!("QRIS provider credentials are incomplete; /api/qris routes will fail.");
        None
      }
    };

    let whatsapp_api_url = get_env("WHATSAPP_API_URL").map(|u| u.trim_end_matches('/').to_string());
    if whatsapp_api_url.is_none() {
      tracing::warn!("WHATSAPP_API_URL is not set; /api/whatsapp routes will fail.");
    }

    let session_backend = match (get_env("SUPABASE_URL"), get_env("SUPABASE_ANON_KEY")) {
      (Some(url), Some(anon_key)) => Some(SessionBackendConfig {
        url: url.trim_end_matches('/').to_string(),
        anon_key: Secret::new(anon_key),
      }),
      _ => {
        tracing::warn!("Session backend is not configured; every request is treated as anonymous.");
        None
      }
    };

    let proxy_image_hosts = get_env("PROXY_IMAGE_HOSTS")
      .map(|hosts| {
        hosts
          .split(',')
          .map(|h| h.trim().to_ascii_lowercase())
          .filter(|h| !h.is_empty())
          .collect()
      })
      .unwrap_or_default();
    let proxy_image_max_bytes = match get_env("PROXY_IMAGE_MAX_BYTES") {
      Some(raw) => raw
        .parse::<usize>()
        .map_err(|e| AppError::Config(format!("Invalid PROXY_IMAGE_MAX_BYTES: {}", e)))?,
      None => DEFAULT_PROXY_IMAGE_MAX_BYTES,
    };

    let config = Self {
      server_host,
      server_port,
      app_public_url: get_env("APP_PUBLIC_URL").map(|u| u.trim_end_matches('/').to_string()),
      qris,
      whatsapp_api_url,
      session_backend,
      session_cookie: get_env("SESSION_COOKIE").unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
      proxy_image_hosts,
      proxy_image_max_bytes,
    };

    tracing::info!("Application configuration loaded successfully.");
    tracing::debug!(config = ?config, "Loaded config details");
    Ok(config)
  }

  /// A configuration with every provider unset. Used by tests and as a base
  /// for programmatic setups.
  pub fn bare() -> Self {
    Self {
      server_host: "127.0.0.1".to_string(),
      server_port: 8080,
      app_public_url: None,
      qris: None,
      whatsapp_api_url: None,
      session_backend: None,
      session_cookie: DEFAULT_SESSION_COOKIE.to_string(),
      proxy_image_hosts: Vec::new(),
      proxy_image_max_bytes: DEFAULT_PROXY_IMAGE_MAX_BYTES,
    }
  }

  /// Where the provider should post payment notifications, when the public URL is known.
  pub fn qris_callback_url(&self) -> Option<String> {
    self.app_public_url.as_ref().map(|base| format!("{}/api/qris/callback", base))
  }
}
