// app/src/web/guard.rs

//! Page-level navigation guard: redirects anonymous or under-privileged
//! visitors before a protected page is served.

use crate::services::session_backend::Role;
use crate::state::AppState;
use crate::web::auth::{verify_api_auth, AuthStatus};
use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, HttpResponse};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use tracing::debug;

pub const LOGIN_ROUTE: &str = "/login";
pub const ADMIN_HOME: &str = "/admin";
pub const CUSTOMER_HOME: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
  Allow,
  Redirect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteClass {
  Passthrough,
  Login,
  Admin,
  Member,
  Public,
}

fn classify(path: &str) -> RouteClass {
  if path == "/api" || path.starts_with("/api/") || is_static_asset(path) {
    RouteClass::Passthrough
  } else if path == LOGIN_ROUTE || path.starts_with("/login/") {
    RouteClass::Login
  } else if path.starts_with(ADMIN_HOME) {
    RouteClass::Admin
  } else if path.starts_with("/profile") || path.starts_with("/orders") {
    RouteClass::Member
  } else {
    RouteClass::Public
  }
}

fn is_static_asset(path: &str) -> bool {
  if path.starts_with("/_next/") || path.starts_with("/static/") || path == "/favicon.ico" {
    return true;
  }
  path
    .rsplit('/')
    .next()
    .map(|last| last.contains('.'))
    .unwrap_or(false)
}

pub struct GuardPolicy;

impl GuardPolicy {
  /// Whether `decide` depends on the session for this path.
  pub fn needs_session(path: &str) -> bool {
    matches!(classify(path), RouteClass::Login | RouteClass::Admin | RouteClass::Member)
  }

  pub fn role_home(status: &AuthStatus) -> &'static str {
    match status.role {
      Some(Role::Admin) => ADMIN_HOME,
      _ => CUSTOMER_HOME,
    }
  }

  pub fn decide(path: &str, status: &AuthStatus) -> GuardDecision {
    match classify(path) {
      RouteClass::Passthrough | RouteClass::Public => GuardDecision::Allow,
      RouteClass::Login if status.is_logged_in => GuardDecision::Redirect(Self::role_home(status).to_string()),
      RouteClass::Login => GuardDecision::Allow,
      RouteClass::Admin if !status.is_logged_in => GuardDecision::Redirect(LOGIN_ROUTE.to_string()),
      RouteClass::Admin if !status.is_admin() => GuardDecision::Redirect(CUSTOMER_HOME.to_string()),
      RouteClass::Admin => GuardDecision::Allow,
      RouteClass::Member if !status.is_logged_in => GuardDecision::Redirect(LOGIN_ROUTE.to_string()),
      RouteClass::Member => GuardDecision::Allow,
    }
  }
}

/// Middleware applying [`GuardPolicy`] with a `302 Found` on redirect.
pub struct NavigationGuard;

impl<S, B> Transform<S, ServiceRequest> for NavigationGuard
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = actix_web::Error;
  type Transform = NavigationGuardMiddleware<S>;
  type InitError = ();
  type Future = Ready<Result<Self::Transform, Self::InitError>>;

  fn new_transform(&self, service: S) -> Self::Future {
    ready(Ok(NavigationGuardMiddleware {
      service: Rc::new(service),
    }))
  }
}

pub struct NavigationGuardMiddleware<S> {
  service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for NavigationGuardMiddleware<S>
where
  S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
  S::Future: 'static,
  B: 'static,
{
  type Response = ServiceResponse<EitherBody<B>>;
  type Error = actix_web::Error;
  type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

  forward_ready!(service);

  fn call(&self, req: ServiceRequest) -> Self::Future {
    let service = Rc::clone(&self.service);

    Box::pin(async move {
      let path = req.path().to_string();
      let state = req.app_data::<web::Data<AppState>>().cloned();

      let decision = match state {
        Some(state) if GuardPolicy::needs_session(&path) => {
          let status = verify_api_auth(req.request(), state.sessions.as_ref(), &state.config.session_cookie).await;
          GuardPolicy::decide(&path, &status)
        }
        _ => GuardDecision::Allow,
      };

      match decision {
        GuardDecision::Allow => service.call(req).await.map(ServiceResponse::map_into_left_body),
        GuardDecision::Redirect(location) => {
          debug!(%path, %location, "Navigation guard redirect.");
          let response = HttpResponse::Found()
            .insert_header((header::LOCATION, location))
            .finish()
            .map_into_right_body();
          Ok(req.into_response(response))
        }
      }
    })
  }
}
