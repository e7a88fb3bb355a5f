// tests/common/mod.rs
#![allow(dead_code)] // Allow unused code in this common test module

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use kopi_checkout::{
  CheckoutConfig, CheckoutDeps, CheckoutError, CheckoutMachine, CheckoutResult, CreatePaymentOutcome,
  CreatePaymentRequest, FetchedImage, FileShare, ImageFetcher, LocalStore, Navigator, Notice, NoticeLevel, Notifier,
  OrderChange, OrderItem, OrderPatch, OrderRow, OrderStatus, OrderStore, OrderSubscription, OrderType, PaymentGateway,
  PaymentStatusOutcome, PendingOrder, QrFile, QrisData, SavePlatform, ShareError, PENDING_ORDER_KEY,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::Level;

pub const ORDER_ID: &str = "ord_1";

// --- Fixtures ---

pub fn pending_order(order_type: OrderType) -> PendingOrder {
  PendingOrder {
    order_id: ORDER_ID.to_string(),
    items: vec![
      OrderItem {
        name: "Es Kopi Susu".to_string(),
        quantity: 2,
        price: 5000,
        note: Some("less sugar".to_string()),
      },
      OrderItem {
        name: "Croissant".to_string(),
        quantity: 1,
        price: 5000,
        note: None,
      },
    ],
    total: 15000,
    order_type,
    address: match order_type {
      OrderType::Delivery => Some("Jl. Merdeka 10".to_string()),
      OrderType::Pickup => None,
    },
  }
}

pub fn qris_data(transaction_id: &str) -> QrisData {
  QrisData {
    qris_url: "https://x/y.png".to_string(),
    transaction_id: transaction_id.to_string(),
    expires_at: Utc::now() + ChronoDuration::minutes(10),
  }
}

pub fn order_row(status: OrderStatus) -> OrderRow {
  OrderRow {
    id: ORDER_ID.to_string(),
    status,
    customer_name: Some("Budi".to_string()),
    customer_phone: Some("081234567890".to_string()),
    ..Default::default()
  }
}

// --- Order store ---

#[derive(Default)]
pub struct MemoryOrderStore {
  pub rows: Mutex<HashMap<String, OrderRow>>,
  pub updates: Mutex<Vec<(String, OrderPatch)>>,
  pub fetches: AtomicUsize,
  pub fail_fetch: Mutex<bool>,
  /// Applied before each write lands.
  pub update_delay: Mutex<Option<Duration>>,
  subscribers: Mutex<Vec<(String, mpsc::UnboundedSender<OrderChange>)>>,
  pub subscriptions_opened: AtomicUsize,
  pub subscriptions_closed: Arc<AtomicUsize>,
}

impl MemoryOrderStore {
  pub fn with_row(row: OrderRow) -> Arc<Self> {
    let store = Self::default();
    store.rows.lock().insert(row.id.clone(), row);
    Arc::new(store)
  }

  pub fn row(&self, order_id: &str) -> OrderRow {
    self.rows.lock().get(order_id).cloned().expect("row exists")
  }

  /// Writes a status as another actor would (e.g. an admin) without notifying.
  pub fn set_status(&self, order_id: &str, status: OrderStatus) {
    if let Some(row) = self.rows.lock().get_mut(order_id) {
      row.status = status;
    }
  }

  /// Writes a status and pushes the realtime notification.
  pub fn push_status(&self, order_id: &str, status: OrderStatus) {
    self.set_status(order_id, status.clone());
    for (watched, tx) in self.subscribers.lock().iter() {
      if watched == order_id {
        let _ = tx.send(OrderChange {
          order_id: order_id.to_string(),
          status: status.clone(),
        });
      }
    }
  }

  pub fn update_count(&self) -> usize {
    self.updates.lock().len()
  }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
  async fn fetch_order(&self, order_id: &str) -> CheckoutResult<OrderRow> {
    self.fetches.fetch_add(1, Ordering::SeqCst);
    if *self.fail_fetch.lock() {
      return Err(CheckoutError::Store {
        order_id: order_id.to_string(),
        source: anyhow::anyhow!("backend unavailable"),
      });
    }
    self.rows.lock().get(order_id).cloned().ok_or_else(|| CheckoutError::OrderNotFound {
      order_id: order_id.to_string(),
    })
  }

  async fn update_order(&self, order_id: &str, patch: OrderPatch) -> CheckoutResult<()> {
    let delay = *self.update_delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
    let mut rows = self.rows.lock();
    let row = rows.get_mut(order_id).ok_or_else(|| CheckoutError::OrderNotFound {
      order_id: order_id.to_string(),
    })?;
    if let Some(status) = &patch.status {
      row.status = status.clone();
    }
    if let Some(data) = &patch.payment_data {
      row.payment_data = Some(data.clone());
    }
    if let Some(method) = patch.payment_method {
      row.payment_method = Some(method);
    }
    self.updates.lock().push((order_id.to_string(), patch));
    Ok(())
  }

  async fn subscribe(&self, order_id: &str) -> CheckoutResult<OrderSubscription> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.lock().push((order_id.to_string(), tx));
    self.subscriptions_opened.fetch_add(1, Ordering::SeqCst);
    let closed = self.subscriptions_closed.clone();
    Ok(OrderSubscription::new(rx, move || {
      closed.fetch_add(1, Ordering::SeqCst);
    }))
  }
}

// --- Payment gateway ---

pub struct FakeGateway {
  pub create_outcome: Mutex<CheckoutResult<CreatePaymentOutcome>>,
  pub status_outcome: Mutex<PaymentStatusOutcome>,
  pub create_requests: Mutex<Vec<CreatePaymentRequest>>,
  pub status_calls: AtomicUsize,
  pub delay: Mutex<Option<Duration>>,
}

impl FakeGateway {
  pub fn creating(data: QrisData) -> Arc<Self> {
    Arc::new(Self {
      create_outcome: Mutex::new(Ok(CreatePaymentOutcome::Created(data))),
      status_outcome: Mutex::new(PaymentStatusOutcome::Reported(kopi_checkout::PaymentStatus::Pending)),
      create_requests: Mutex::new(Vec::new()),
      status_calls: AtomicUsize::new(0),
      delay: Mutex::new(None),
    })
  }

  pub fn set_status(&self, outcome: PaymentStatusOutcome) {
    *self.status_outcome.lock() = outcome;
  }

  pub fn create_count(&self) -> usize {
    self.create_requests.lock().len()
  }

  async fn maybe_wait(&self) {
    let delay = *self.delay.lock();
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
  }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
  async fn create_payment(&self, request: CreatePaymentRequest) -> CheckoutResult<CreatePaymentOutcome> {
    self.create_requests.lock().push(request);
    self.maybe_wait().await;
    match &*self.create_outcome.lock() {
      Ok(outcome) => Ok(outcome.clone()),
      Err(e) => Err(CheckoutError::Gateway { message: e.to_string() }),
    }
  }

  async fn check_status(&self, _transaction_id: &str) -> CheckoutResult<PaymentStatusOutcome> {
    self.status_calls.fetch_add(1, Ordering::SeqCst);
    self.maybe_wait().await;
    Ok(self.status_outcome.lock().clone())
  }
}

// --- Browser services ---

#[derive(Default)]
pub struct MemoryLocalStore {
  pub entries: Mutex<HashMap<String, String>>,
}

impl MemoryLocalStore {
  pub fn with_order(order: &PendingOrder) -> Arc<Self> {
    let store = Self::default();
    store
      .entries
      .lock()
      .insert(PENDING_ORDER_KEY.to_string(), serde_json::to_string(order).expect("serializable"));
    Arc::new(store)
  }

  pub fn has_pending_order(&self) -> bool {
    self.entries.lock().contains_key(PENDING_ORDER_KEY)
  }
}

impl LocalStore for MemoryLocalStore {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.lock().get(key).cloned()
  }

  fn remove(&self, key: &str) {
    self.entries.lock().remove(key);
  }
}

#[derive(Default)]
pub struct RecordingNotifier {
  pub notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
  pub fn count(&self, level: NoticeLevel) -> usize {
    self.notices.lock().iter().filter(|n| n.level == level).count()
  }

  pub fn last(&self) -> Option<Notice> {
    self.notices.lock().last().cloned()
  }
}

impl Notifier for RecordingNotifier {
  fn notify(&self, notice: Notice) {
    tracing::debug!(target: "test_notifier", ?notice, "notice");
    self.notices.lock().push(notice);
  }
}

#[derive(Default)]
pub struct RecordingNavigator {
  pub routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
  pub fn visited(&self) -> Vec<String> {
    self.routes.lock().clone()
  }
}

impl Navigator for RecordingNavigator {
  fn navigate(&self, route: &str) {
    self.routes.lock().push(route.to_string());
  }
}

// --- QR download ---

pub struct FakeImages {
  pub fail: bool,
  /// Never answers.
  pub hang: bool,
}

#[async_trait]
impl ImageFetcher for FakeImages {
  async fn fetch(&self, url: &str) -> CheckoutResult<FetchedImage> {
    if self.hang {
      tokio::time::sleep(Duration::from_secs(3600)).await;
    }
    if self.fail {
      return Err(CheckoutError::Gateway {
        message: format!("cannot fetch {url}"),
      });
    }
    Ok(FetchedImage {
      bytes: vec![0x89, b'P', b'N', b'G'],
      content_type: "image/png".to_string(),
    })
  }
}

pub struct FakeShare {
  pub result: Result<(), ShareError>,
  pub shared: Mutex<Vec<String>>,
}

#[async_trait]
impl FileShare for FakeShare {
  async fn share(&self, file: &QrFile) -> Result<(), ShareError> {
    self.shared.lock().push(file.file_name.clone());
    self.result.clone()
  }
}

pub struct FakePlatform {
  pub share: Option<FakeShare>,
  pub download_fails: bool,
  pub downloads: Mutex<Vec<String>>,
  pub opened: Mutex<Vec<String>>,
}

impl FakePlatform {
  pub fn without_share() -> Self {
    Self {
      share: None,
      download_fails: false,
      downloads: Mutex::new(Vec::new()),
      opened: Mutex::new(Vec::new()),
    }
  }

  pub fn sharing(result: Result<(), ShareError>) -> Self {
    Self {
      share: Some(FakeShare {
        result,
        shared: Mutex::new(Vec::new()),
      }),
      ..Self::without_share()
    }
  }
}

#[async_trait]
impl SavePlatform for FakePlatform {
  fn share_capability(&self) -> Option<&dyn FileShare> {
    self.share.as_ref().map(|s| s as &dyn FileShare)
  }

  async fn download(&self, file: &QrFile) -> CheckoutResult<()> {
    if self.download_fails {
      return Err(CheckoutError::Storage("download blocked".to_string()));
    }
    self.downloads.lock().push(file.file_name.clone());
    Ok(())
  }

  fn open_external(&self, url: &str) {
    self.opened.lock().push(url.to_string());
  }
}

// --- Harness ---

pub struct Harness {
  pub machine: Arc<CheckoutMachine>,
  pub orders: Arc<MemoryOrderStore>,
  pub gateway: Arc<FakeGateway>,
  pub storage: Arc<MemoryLocalStore>,
  pub notifier: Arc<RecordingNotifier>,
  pub navigator: Arc<RecordingNavigator>,
  pub platform: Arc<FakePlatform>,
}

pub struct HarnessBuilder {
  row: OrderRow,
  storage: Arc<MemoryLocalStore>,
  gateway: Arc<FakeGateway>,
  platform: FakePlatform,
  images_fail: bool,
  images_hang: bool,
  config: CheckoutConfig,
}

impl HarnessBuilder {
  pub fn new() -> Self {
    Self {
      row: order_row(OrderStatus::Pending),
      storage: MemoryLocalStore::with_order(&pending_order(OrderType::Pickup)),
      gateway: FakeGateway::creating(qris_data("tx1")),
      platform: FakePlatform::without_share(),
      images_fail: false,
      images_hang: false,
      config: CheckoutConfig::default(),
    }
  }

  pub fn row(mut self, row: OrderRow) -> Self {
    self.row = row;
    self
  }

  pub fn storage(mut self, storage: Arc<MemoryLocalStore>) -> Self {
    self.storage = storage;
    self
  }

  pub fn gateway(mut self, gateway: Arc<FakeGateway>) -> Self {
    self.gateway = gateway;
    self
  }

  pub fn platform(mut self, platform: FakePlatform) -> Self {
    self.platform = platform;
    self
  }

  pub fn images_fail(mut self) -> Self {
    self.images_fail = true;
    self
  }

  pub fn images_hang(mut self) -> Self {
    self.images_hang = true;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.config.request_timeout = timeout;
    self
  }

  pub fn build(self) -> Harness {
    let orders = MemoryOrderStore::with_row(self.row);
    let notifier = Arc::new(RecordingNotifier::default());
    let navigator = Arc::new(RecordingNavigator::default());
    let platform = Arc::new(self.platform);
    let deps = CheckoutDeps {
      orders: orders.clone(),
      gateway: self.gateway.clone(),
      storage: self.storage.clone(),
      notifier: notifier.clone(),
      navigator: navigator.clone(),
      images: Arc::new(FakeImages {
        fail: self.images_fail,
        hang: self.images_hang,
      }),
      platform: platform.clone(),
    };
    Harness {
      machine: CheckoutMachine::new(deps, self.config),
      orders,
      gateway: self.gateway,
      storage: self.storage,
      notifier,
      navigator,
      platform,
    }
  }
}

/// Lets the realtime listener task drain its queue.
pub async fn settle_tasks() {
  for _ in 0..10 {
    tokio::task::yield_now().await;
  }
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
