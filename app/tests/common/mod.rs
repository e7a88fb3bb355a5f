// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use kopi_app::config::AppConfig;
use kopi_app::errors::{AppError, Result as AppResult};
use kopi_app::services::messaging_provider::{MessagingProvider, WhatsappConnection};
use kopi_app::services::qris_provider::{CreatedPayment, PaymentStatusReply, QrisProvider};
use kopi_app::services::session_backend::{Role, SessionBackend, SessionUser};
use kopi_app::state::AppState;
use kopi_checkout::CreatePaymentRequest;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Level;

pub const ADMIN_TOKEN: &str = "admin-token";
pub const CUSTOMER_TOKEN: &str = "customer-token";
/// Makes the fake session backend fail.
pub const BROKEN_TOKEN: &str = "broken-token";

type Reply<T> = Box<dyn Fn() -> AppResult<T> + Send + Sync>;

// --- Fake QRIS provider ---

pub struct FakeQris {
  pub create_reply: Mutex<Reply<CreatedPayment>>,
  pub status_reply: Mutex<Reply<PaymentStatusReply>>,
  pub create_requests: Mutex<Vec<CreatePaymentRequest>>,
  pub status_requests: Mutex<Vec<String>>,
}

impl Default for FakeQris {
  fn default() -> Self {
    Self {
      create_reply: Mutex::new(Box::new(|| {
        CreatedPayment::parse(json!({
          "success": true,
          "qris_url": "https://qr.example.com/tx_1.png",
          "transaction_id": "tx_1",
          "expires_at": "2030-01-01T00:15:00Z",
          "merchant": "Kopi Kita",
        }))
      })),
      status_reply: Mutex::new(Box::new(|| PaymentStatusReply::parse(json!({ "success": true, "status": "pending" })))),
      create_requests: Mutex::new(Vec::new()),
      status_requests: Mutex::new(Vec::new()),
    }
  }
}

impl FakeQris {
  pub fn on_create(&self, reply: impl Fn() -> AppResult<CreatedPayment> + Send + Sync + 'static) {
    *self.create_reply.lock() = Box::new(reply);
  }

  pub fn on_status(&self, reply: impl Fn() -> AppResult<PaymentStatusReply> + Send + Sync + 'static) {
    *self.status_reply.lock() = Box::new(reply);
  }
}

#[async_trait]
impl QrisProvider for FakeQris {
  async fn create_payment(&self, request: &CreatePaymentRequest) -> AppResult<CreatedPayment> {
    self.create_requests.lock().push(request.clone());
    (*self.create_reply.lock())()
  }

  async fn check_status(&self, transaction_id: &str) -> AppResult<PaymentStatusReply> {
    self.status_requests.lock().push(transaction_id.to_string());
    let mut reply = (*self.status_reply.lock())()?;
    reply.data.transaction_id.get_or_insert_with(|| transaction_id.to_string());
    Ok(reply)
  }
}

// --- Fake messaging gateway ---

pub struct FakeMessaging {
  pub sent: Mutex<Vec<(String, String)>>,
  pub connection_reply: Mutex<Reply<WhatsappConnection>>,
  pub logouts: Mutex<usize>,
}

impl Default for FakeMessaging {
  fn default() -> Self {
    Self {
      sent: Mutex::new(Vec::new()),
      connection_reply: Mutex::new(Box::new(|| {
        Ok(WhatsappConnection {
          connected: false,
          qr: Some("data:image/png;base64,AAAA".to_string()),
          message: Some("Scan to link".to_string()),
        })
      })),
      logouts: Mutex::new(0),
    }
  }
}

impl FakeMessaging {
  pub fn on_connection(&self, reply: impl Fn() -> AppResult<WhatsappConnection> + Send + Sync + 'static) {
    *self.connection_reply.lock() = Box::new(reply);
  }

  pub fn sent(&self) -> Vec<(String, String)> {
    self.sent.lock().clone()
  }
}

#[async_trait]
impl MessagingProvider for FakeMessaging {
  async fn send_message(&self, phone: &str, message: &str) -> AppResult<Value> {
    self.sent.lock().push((phone.to_string(), message.to_string()));
    Ok(json!({ "id": "msg_1", "status": "queued" }))
  }

  async fn connection(&self) -> AppResult<WhatsappConnection> {
    (*self.connection_reply.lock())()
  }

  async fn logout(&self) -> AppResult<Value> {
    *self.logouts.lock() += 1;
    Ok(json!({ "success": true, "message": "Logged out" }))
  }
}

// --- Fake session backend ---

pub struct FakeSessions {
  users: HashMap<String, SessionUser>,
}

impl Default for FakeSessions {
  fn default() -> Self {
    let mut users = HashMap::new();
    users.insert(
      ADMIN_TOKEN.to_string(),
      SessionUser {
        id: "user_admin".to_string(),
        email: Some("barista@kopikita.id".to_string()),
        role: Role::Admin,
      },
    );
    users.insert(
      CUSTOMER_TOKEN.to_string(),
      SessionUser {
        id: "user_customer".to_string(),
        email: Some("budi@example.com".to_string()),
        role: Role::Customer,
      },
    );
    Self { users }
  }
}

#[async_trait]
impl SessionBackend for FakeSessions {
  async fn resolve(&self, token: &str) -> anyhow::Result<Option<SessionUser>> {
    if token == BROKEN_TOKEN {
      anyhow::bail!("auth backend unavailable");
    }
    Ok(self.users.get(token).cloned())
  }
}

// --- Harness ---

pub struct Harness {
  pub qris: Arc<FakeQris>,
  pub messaging: Arc<FakeMessaging>,
  pub state: AppState,
}

impl Harness {
  pub fn new() -> Self {
    setup_tracing();
    let qris = Arc::new(FakeQris::default());
    let messaging = Arc::new(FakeMessaging::default());
    let state = AppState {
      config: Arc::new(AppConfig::bare()),
      http_client: reqwest::Client::new(),
      qris: qris.clone(),
      messaging: messaging.clone(),
      sessions: Arc::new(FakeSessions::default()),
    };
    Self { qris, messaging, state }
  }
}

pub fn upstream(status: u16, message: &str) -> AppError {
  AppError::Upstream {
    status,
    message: message.to_string(),
  }
}

pub fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

// --- Helper for Tracing Setup (call once per test run if needed) ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

/// Builds the service under test with the routes and navigation guard wired as in `main`.
/// Unrouted paths answer 200 `page` so guard decisions are observable.
macro_rules! init_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state))
        .configure(kopi_app::web::configure_app_routes)
        .default_service(actix_web::web::to(|| async { actix_web::HttpResponse::Ok().body("page") }))
        .wrap(kopi_app::web::NavigationGuard),
    )
    .await
  };
}
