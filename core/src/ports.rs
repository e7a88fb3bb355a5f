// core/src/ports.rs

//! Collaborators the checkout page drives. Implementations live with the
//! host (browser bindings, test fakes); the machine only sees these traits.

use crate::error::CheckoutResult;
use crate::order::{OrderChange, OrderPatch, OrderRow};
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

// --- Order storage backend ---

/// A live change feed for one order row.
///
/// The feed is closed exactly once: either by [`OrderSubscription::close`] or
/// when the subscription is dropped.
pub struct OrderSubscription {
  changes: mpsc::UnboundedReceiver<OrderChange>,
  on_close: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl OrderSubscription {
  pub fn new(changes: mpsc::UnboundedReceiver<OrderChange>, on_close: impl FnOnce() + Send + Sync + 'static) -> Self {
    Self {
      changes,
      on_close: Some(Box::new(on_close)),
    }
  }

  /// Waits for the next change. `None` once the feed has ended.
  pub async fn next(&mut self) -> Option<OrderChange> {
    self.changes.recv().await
  }

  pub fn close(&mut self) {
    if let Some(on_close) = self.on_close.take() {
      self.changes.close();
      on_close();
    }
  }

  pub fn is_closed(&self) -> bool {
    self.on_close.is_none()
  }
}

impl Drop for OrderSubscription {
  fn drop(&mut self) {
    self.close();
  }
}

impl fmt::Debug for OrderSubscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OrderSubscription")
      .field("closed", &self.is_closed())
      .finish()
  }
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn fetch_order(&self, order_id: &str) -> CheckoutResult<OrderRow>;

  async fn update_order(&self, order_id: &str, patch: OrderPatch) -> CheckoutResult<()>;

  /// Opens a change feed scoped to `order_id` only.
  async fn subscribe(&self, order_id: &str) -> CheckoutResult<OrderSubscription>;
}

// --- Browser-side services ---

/// Durable key/value handoff from the ordering flow (browser local storage).
pub trait LocalStore: Send + Sync {
  fn get(&self, key: &str) -> Option<String>;
  fn remove(&self, key: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
  Success,
  Info,
  Error,
}

/// A toast shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub level: NoticeLevel,
  pub message: String,
}

impl Notice {
  pub fn success(message: impl Into<String>) -> Self {
    Self { level: NoticeLevel::Success, message: message.into() }
  }

  pub fn info(message: impl Into<String>) -> Self {
    Self { level: NoticeLevel::Info, message: message.into() }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self { level: NoticeLevel::Error, message: message.into() }
  }
}

pub trait Notifier: Send + Sync {
  fn notify(&self, notice: Notice);
}

pub trait Navigator: Send + Sync {
  fn navigate(&self, route: &str);
}

// --- QR download ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
  pub bytes: Vec<u8>,
  pub content_type: String,
}

/// Fetches third-party images through the same-origin image proxy.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
  async fn fetch(&self, url: &str) -> CheckoutResult<FetchedImage>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrFile {
  pub file_name: String,
  pub image: FetchedImage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
  /// The customer closed the share sheet.
  Dismissed,
  Failed(String),
}

/// Native file sharing (Web Share API with file payloads).
#[async_trait]
pub trait FileShare: Send + Sync {
  async fn share(&self, file: &QrFile) -> Result<(), ShareError>;
}

#[async_trait]
pub trait SavePlatform: Send + Sync {
  /// Checked on every download; `None` when the platform cannot share files.
  fn share_capability(&self) -> Option<&dyn FileShare>;

  async fn download(&self, file: &QrFile) -> CheckoutResult<()>;

  /// Opens `url` in a new viewing context.
  fn open_external(&self, url: &str);
}
