// app/src/services/mod.rs

//! Outbound clients for the third-party providers the app proxies.

pub mod messaging_provider;
pub mod qris_provider;
pub mod session_backend;

use crate::errors::{AppError, Result as AppResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;

/// Single-attempt bound for every provider call.
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads a provider response, turning non-2xx answers and `{success: false}`
/// bodies into [`AppError::Upstream`].
pub(crate) async fn read_provider_json(response: reqwest::Response) -> AppResult<Value> {
  let status = response.status();
  let bytes = response.bytes().await?;
  let body: Option<Value> = serde_json::from_slice(&bytes).ok();

  if !status.is_success() {
    let message = body
      .as_ref()
      .and_then(provider_message)
      .unwrap_or_else(|| status.canonical_reason().unwrap_or("Provider request failed").to_string());
    return Err(AppError::Upstream {
      status: status.as_u16(),
      message,
    });
  }

  let body = body.ok_or_else(|| AppError::UpstreamShape("response body is not JSON".to_string()))?;
  if body.get("success").and_then(Value::as_bool) == Some(false) {
    return Err(AppError::Upstream {
      status: 400,
      message: provider_message(&body).unwrap_or_else(|| "Provider rejected the request".to_string()),
    });
  }
  Ok(body)
}

fn provider_message(body: &Value) -> Option<String> {
  ["error", "message"]
    .iter()
    .find_map(|key| body.get(*key).and_then(Value::as_str))
    .map(str::to_string)
}

/// A validated provider success body: the fields we branch on, typed, plus
/// whatever else the provider sent, forwarded untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderPayload<T> {
  pub data: T,
  pub extra: Map<String, Value>,
}

impl<T: DeserializeOwned + Serialize> ProviderPayload<T> {
  pub fn parse(body: Value) -> AppResult<Self> {
    let data: T = serde_json::from_value(body.clone()).map_err(|e| AppError::UpstreamShape(e.to_string()))?;
    let mut extra = match body {
      Value::Object(fields) => fields,
      _ => Map::new(),
    };
    if let Ok(Value::Object(known)) = serde_json::to_value(&data) {
      for key in known.keys() {
        extra.remove(key);
      }
    }
    extra.remove("success");
    Ok(Self { data, extra })
  }

  /// `{success: true, ...typed fields, ...extra}`.
  pub fn into_success_body(self) -> Value {
    let mut body = self.extra;
    if let Ok(Value::Object(known)) = serde_json::to_value(&self.data) {
      body.extend(known);
    }
    body.insert("success".to_string(), Value::Bool(true));
    Value::Object(body)
  }
}
