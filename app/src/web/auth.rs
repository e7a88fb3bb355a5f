// app/src/web/auth.rs

use crate::errors::AppError;
use crate::services::session_backend::{Role, SessionBackend, SessionUser};
use crate::state::AppState;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthStatus {
  pub is_logged_in: bool,
  pub role: Option<Role>,
  pub user: Option<SessionUser>,
}

impl AuthStatus {
  pub fn anonymous() -> Self {
    Self::default()
  }

  pub fn signed_in(user: SessionUser) -> Self {
    Self {
      is_logged_in: true,
      role: Some(user.role),
      user: Some(user),
    }
  }

  pub fn is_admin(&self) -> bool {
    self.is_logged_in && self.role == Some(Role::Admin)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
  Unauthorized,
  Forbidden,
}

impl From<AuthRejection> for AppError {
  fn from(rejection: AuthRejection) -> Self {
    match rejection {
      AuthRejection::Unauthorized => AppError::Unauthorized,
      AuthRejection::Forbidden => AppError::Forbidden,
    }
  }
}

/// Bearer header first, then the session cookie.
pub fn session_token(req: &HttpRequest, cookie_name: &str) -> Option<String> {
  let bearer = req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_string);

  bearer.or_else(|| {
    req
      .cookie(cookie_name)
      .map(|c| c.value().to_string())
      .filter(|t| !t.is_empty())
  })
}

/// Never fails: a missing token or a backend error both mean "not logged in".
pub async fn verify_api_auth(req: &HttpRequest, sessions: &dyn SessionBackend, cookie_name: &str) -> AuthStatus {
  let Some(token) = session_token(req, cookie_name) else {
    return AuthStatus::anonymous();
  };

  match sessions.resolve(&token).await {
    Ok(Some(user)) => AuthStatus::signed_in(user),
    Ok(None) => {
      debug!("Session token did not resolve to a user.");
      AuthStatus::anonymous()
    }
    Err(e) => {
      warn!(error = %e, "Session lookup failed; treating request as anonymous.");
      AuthStatus::anonymous()
    }
  }
}

pub fn require_admin_auth(status: &AuthStatus) -> Result<(), AuthRejection> {
  if !status.is_logged_in {
    Err(AuthRejection::Unauthorized)
  } else if !status.is_admin() {
    Err(AuthRejection::Forbidden)
  } else {
    Ok(())
  }
}

/// Extractor for admin-only handlers. Rejects with 401 or 403 before the handler runs.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionUser);

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
    let req = req.clone();
    Box::pin(async move {
      let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| AppError::Internal("AppState is not registered".to_string()))?;

      let status = verify_api_auth(&req, state.sessions.as_ref(), &state.config.session_cookie).await;
      require_admin_auth(&status)?;
      status
        .user
        .map(AdminUser)
        .ok_or_else(|| AppError::Internal("admin session without user".to_string()))
    })
  }
}
