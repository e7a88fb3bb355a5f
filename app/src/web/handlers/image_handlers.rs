// app/src/web/handlers/image_handlers.rs

use actix_web::http::{header, StatusCode};
use actix_web::{web, HttpResponse};
use reqwest::redirect::Policy;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::net::IpAddr;
use tracing::{error, instrument, warn};

use crate::services::PROVIDER_TIMEOUT;
use crate::state::AppState;

pub const DEFAULT_IMAGE_CONTENT_TYPE: &str = "image/png";
pub const IMAGE_CACHE_CONTROL: &str = "public, max-age=3600";
const MAX_IMAGE_REDIRECTS: usize = 5;

#[derive(Deserialize, Debug)]
pub struct ProxyImageQuery {
  #[serde(default)]
  pub url: Option<String>,
}

fn image_error(status: StatusCode, message: &str) -> HttpResponse {
  HttpResponse::build(status).json(json!({ "error": message }))
}

/// Only absolute http(s) URLs are fetched.
fn parse_image_url(raw: Option<&str>) -> Option<Url> {
  let url = Url::parse(raw?.trim()).ok()?;
  matches!(url.scheme(), "http" | "https").then_some(url)
}

fn is_public_ip(ip: IpAddr) -> bool {
  match ip {
    IpAddr::V4(v4) => {
      !(v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified() || v4.is_broadcast())
    }
    IpAddr::V6(v6) => {
      if let Some(mapped) = v6.to_ipv4_mapped() {
        return is_public_ip(IpAddr::V4(mapped));
      }
      let first = v6.segments()[0];
      // fc00::/7 unique local, fe80::/10 link local
      !(v6.is_loopback() || v6.is_unspecified() || (first & 0xfe00) == 0xfc00 || (first & 0xffc0) == 0xfe80)
    }
  }
}

/// With an allowlist the host must be on it. Without one, loopback
/// and private network hosts are refused.
fn host_allowed(url: &Url, allowed_hosts: &[String]) -> bool {
  let Some(host) = url.host_str() else {
    return false;
  };
  let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();
  if !allowed_hosts.is_empty() {
    return allowed_hosts
      .iter()
      .any(|allowed| allowed.trim_start_matches('[').trim_end_matches(']') == host);
  }
  match host.parse::<IpAddr>() {
    Ok(ip) => is_public_ip(ip),
    Err(_) => !(host == "localhost" || host.ends_with(".localhost")),
  }
}

/// Redirect targets are screened like the requested URL.
pub fn image_redirect_policy(allowed_hosts: Vec<String>) -> Policy {
  Policy::custom(move |attempt| {
    if attempt.previous().len() >= MAX_IMAGE_REDIRECTS {
      attempt.error("too many redirects")
    } else if host_allowed(attempt.url(), &allowed_hosts) {
      attempt.follow()
    } else {
      attempt.stop()
    }
  })
}

/// `Ok(None)` when the body grows past `limit`.
async fn read_capped(mut response: reqwest::Response, limit: usize) -> reqwest::Result<Option<Vec<u8>>> {
  if response.content_length().is_some_and(|len| len > limit as u64) {
    return Ok(None);
  }
  let mut body = Vec::new();
  while let Some(chunk) = response.chunk().await? {
    if body.len() + chunk.len() > limit {
      return Ok(None);
    }
    body.extend_from_slice(&chunk);
  }
  Ok(Some(body))
}

/// Re-serves a remote image from our own origin so browsers can save it.
#[instrument(name = "handler::proxy_image", skip(app_state, query))]
pub async fn proxy_image_handler(app_state: web::Data<AppState>, query: web::Query<ProxyImageQuery>) -> HttpResponse {
  let Some(url) = parse_image_url(query.url.as_deref()) else {
    warn!("Rejecting image proxy request without a valid http(s) url.");
    return image_error(StatusCode::BAD_REQUEST, "A valid http(s) url parameter is required");
  };
  if !host_allowed(&url, &app_state.config.proxy_image_hosts) {
    warn!(host = url.host_str().unwrap_or_default(), "Rejecting image proxy request for a disallowed host.");
    return image_error(StatusCode::BAD_REQUEST, "Image host is not allowed");
  }

  let response = match app_state.http_client.get(url.clone()).timeout(PROVIDER_TIMEOUT).send().await {
    Ok(resp) if resp.status().is_success() => resp,
    Ok(resp) => {
      error!(%url, status = %resp.status(), "Upstream image fetch rejected.");
      return image_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch image");
    }
    Err(e) => {
      error!(%url, error = %e, "Upstream image fetch failed.");
      return image_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch image");
    }
  };

  let content_type = response
    .headers()
    .get(reqwest::header::CONTENT_TYPE)
    .and_then(|v| v.to_str().ok())
    .map(str::to_string)
    .unwrap_or_else(|| DEFAULT_IMAGE_CONTENT_TYPE.to_string());

  let limit = app_state.config.proxy_image_max_bytes;
  match read_capped(response, limit).await {
    Ok(Some(bytes)) => HttpResponse::Ok()
      .insert_header((header::CONTENT_TYPE, content_type))
      .insert_header((header::CACHE_CONTROL, IMAGE_CACHE_CONTROL))
      .body(bytes),
    Ok(None) => {
      warn!(%url, limit, "Upstream image exceeds the size limit.");
      image_error(StatusCode::BAD_GATEWAY, "Image is too large")
    }
    Err(e) => {
      error!(%url, error = %e, "Upstream image body could not be read.");
      image_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch image")
    }
  }
}
