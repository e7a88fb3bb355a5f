// app/src/services/session_backend.rs

//! Resolves a session token to a user and role against the hosted auth backend.

use super::PROVIDER_TIMEOUT;
use crate::config::SessionBackendConfig;
use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Admin,
  #[default]
  Customer,
}

impl Role {
  /// Unknown or missing role strings fall back to customer.
  pub fn from_profile(role: Option<&str>) -> Self {
    match role {
      Some(r) if r.eq_ignore_ascii_case("admin") => Role::Admin,
      _ => Role::Customer,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionUser {
  pub id: String,
  pub email: Option<String>,
  pub role: Role,
}

#[async_trait]
pub trait SessionBackend: Send + Sync {
  /// `Ok(None)` when the token is not a live session.
  async fn resolve(&self, token: &str) -> anyhow::Result<Option<SessionUser>>;
}

#[derive(Debug, Deserialize)]
struct AuthUser {
  id: String,
  #[serde(default)]
  email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRow {
  #[serde(default)]
  role: Option<String>,
}

pub struct HttpSessionBackend {
  client: reqwest::Client,
  config: Option<SessionBackendConfig>,
}

impl HttpSessionBackend {
  pub fn new(client: reqwest::Client, config: Option<SessionBackendConfig>) -> Self {
    Self { client, config }
  }

  async fn fetch_role(&self, config: &SessionBackendConfig, token: &str, user_id: &str) -> anyhow::Result<Role> {
    let response = self
      .client
      .get(format!("{}/rest/v1/profiles", config.url))
      .query(&[("id", format!("eq.{}", user_id)), ("select", "role".to_string())])
      .header("apikey", config.anon_key.expose())
      .bearer_auth(token)
      .timeout(PROVIDER_TIMEOUT)
      .send()
      .await
      .context("profile lookup request failed")?;

    if !response.status().is_success() {
      bail!("profile lookup returned {}", response.status());
    }
    let rows: Vec<ProfileRow> = response.json().await.context("profile lookup body is not a row list")?;
    Ok(Role::from_profile(rows.first().and_then(|row| row.role.as_deref())))
  }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
  #[instrument(name = "session_backend::resolve", skip_all)]
  async fn resolve(&self, token: &str) -> anyhow::Result<Option<SessionUser>> {
    let Some(config) = self.config.as_ref() else {
      debug!("Session backend not configured; treating request as anonymous.");
      return Ok(None);
    };

    let response = self
      .client
      .get(format!("{}/auth/v1/user", config.url))
      .header("apikey", config.anon_key.expose())
      .bearer_auth(token)
      .timeout(PROVIDER_TIMEOUT)
      .send()
      .await
      .context("session lookup request failed")?;

    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
      return Ok(None);
    }
    if !status.is_success() {
      bail!("session lookup returned {}", status);
    }

    let user: AuthUser = response.json().await.context("session lookup body is not a user")?;
    let role = self.fetch_role(config, token, &user.id).await?;
    debug!(user_id = %user.id, ?role, "Session resolved.");
    Ok(Some(SessionUser {
      id: user.id,
      email: user.email,
      role,
    }))
  }
}
