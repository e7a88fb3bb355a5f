// core/src/machine.rs

//! The checkout page controller.
//!
//! Owns the payment UI state, the realtime subscription to the order row, and
//! the calls to the payment proxy and order backend. User actions and realtime
//! pushes are not mutually excluded: both funnel into [`CheckoutMachine::settle`]
//! and [`CheckoutMachine::abandon_cancelled`], which are idempotent, and the
//! backend `status` column stays the single arbiter.

use crate::download::{save_qr_image, DownloadOutcome};
use crate::error::{CheckoutError, CheckoutResult};
use crate::gateway::{CreatePaymentOutcome, CreatePaymentRequest, PaymentGateway, PaymentStatus, PaymentStatusOutcome};
use crate::order::{OrderChange, OrderPatch, OrderStatus, PaymentMethod, PendingOrder, PENDING_ORDER_KEY};
use crate::ports::{ImageFetcher, LocalStore, Navigator, Notice, Notifier, OrderStore, SavePlatform};
use crate::state::{CheckoutContext, CheckoutState, PaymentState};
use crate::timer::Countdown;
use crate::view::CheckoutView;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

pub const DEFAULT_CUSTOMER_NAME: &str = "Guest Customer";
pub const DEFAULT_CUSTOMER_PHONE: &str = "08123456789";

const GENERIC_PAYMENT_ERROR: &str = "Failed to process payment. Please try again.";
const GENERIC_STATUS_ERROR: &str = "Failed to check payment status. Please try again.";
const CANCELLED_NOTICE: &str = "This order has been cancelled.";
const CANCELLED_WHILE_PAYING_NOTICE: &str =
  "This order was cancelled. If you already paid, please contact the shop with your transaction ID.";

#[derive(Debug, Clone)]
pub struct CheckoutConfig {
  /// Where the page navigates when there is no usable order.
  pub home_route: String,
  /// Upper bound for every backend and proxy call made by the page.
  pub request_timeout: Duration,
}

impl Default for CheckoutConfig {
  fn default() -> Self {
    Self {
      home_route: "/".to_string(),
      request_timeout: Duration::from_secs(15),
    }
  }
}

#[derive(Clone)]
pub struct CheckoutDeps {
  pub orders: Arc<dyn OrderStore>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub storage: Arc<dyn LocalStore>,
  pub notifier: Arc<dyn Notifier>,
  pub navigator: Arc<dyn Navigator>,
  pub images: Arc<dyn ImageFetcher>,
  pub platform: Arc<dyn SavePlatform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOutcome {
  /// No pending order in local storage; navigated home.
  NoActiveOrder,
  /// The backing order is cancelled; navigated home.
  Cancelled,
  Ready(PaymentState),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// Another action holds the processing flag.
  Busy,
  /// Not on the selection screen, or the order is gone.
  Ignored,
  NoMethodSelected,
  OrderCancelled,
  AwaitingQris,
  Completed,
  Rejected(String),
  Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCheckOutcome {
  Busy,
  /// No QR session or pending order to check.
  NotReady,
  OrderCancelled,
  /// The backend already marked the order completed.
  Completed,
  Paid,
  Pending,
  Unpaid(String),
  Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
  Ignored,
  Settled,
  AlreadySettled,
  Cancelled,
}

pub struct CheckoutMachine {
  deps: CheckoutDeps,
  config: CheckoutConfig,
  ctx: CheckoutContext,
  cancelled: AtomicBool,
  listener: Mutex<Option<JoinHandle<()>>>,
}

impl CheckoutMachine {
  pub fn new(deps: CheckoutDeps, config: CheckoutConfig) -> Arc<Self> {
    Arc::new(Self {
      deps,
      config,
      ctx: CheckoutContext::default(),
      cancelled: AtomicBool::new(false),
      listener: Mutex::new(None),
    })
  }

  pub fn context(&self) -> &CheckoutContext {
    &self.ctx
  }

  pub fn state(&self) -> CheckoutState {
    self.ctx.snapshot()
  }

  pub fn view(&self, countdown: Option<Countdown>) -> CheckoutView {
    CheckoutView::from_state(&self.ctx.read(), countdown)
  }

  /// True once the order was seen cancelled by any path.
  pub fn is_cancelled(&self) -> bool {
    self.cancelled.load(Ordering::SeqCst)
  }

  /// True while the realtime listener task is alive.
  pub fn is_listening(&self) -> bool {
    self.listener.lock().as_ref().is_some_and(|t| !t.is_finished())
  }

  // --- Lifecycle ---

  #[instrument(name = "checkout::mount", skip(self))]
  pub async fn mount(self: &Arc<Self>) -> MountOutcome {
    let Some(order) = self.deps.storage.get(PENDING_ORDER_KEY).as_deref().and_then(PendingOrder::from_storage) else {
      warn!("No active order in local storage.");
      self.deps.notifier.notify(Notice::error("No active order found."));
      self.deps.navigator.navigate(&self.config.home_route);
      return MountOutcome::NoActiveOrder;
    };
    let order_id = order.order_id.clone();
    self.ctx.write().pending_order = Some(order);

    match self.timed("order lookup", self.deps.orders.fetch_order(&order_id)).await {
      Ok(row) if row.status.is_cancelled() => {
        self.abandon_cancelled();
        return MountOutcome::Cancelled;
      }
      Ok(row) => {
        if let Some(data) = row.payment_data {
          info!(order_id = %order_id, transaction_id = %data.transaction_id, "Resuming existing QRIS session.");
          let mut state = self.ctx.write();
          state.selected_method = Some(PaymentMethod::Qris);
          state.qris_data = Some(data);
          state.payment_state = PaymentState::QrisWaiting;
        }
      }
      Err(e) => {
        error!(error = %e, order_id = %order_id, "Failed to load order row.");
        self.deps.notifier.notify(Notice::error("Failed to load your order. Please refresh the page."));
      }
    }

    self.listen(&order_id).await;
    MountOutcome::Ready(self.ctx.payment_state())
  }

  async fn listen(self: &Arc<Self>, order_id: &str) {
    let mut subscription = match self.timed("order subscription", self.deps.orders.subscribe(order_id)).await {
      Ok(subscription) => subscription,
      Err(e) => {
        warn!(error = %e, order_id, "Realtime subscription unavailable; relying on manual status checks.");
        return;
      }
    };

    let machine: Weak<Self> = Arc::downgrade(self);
    let task = tokio::spawn(async move {
      while let Some(change) = subscription.next().await {
        let Some(machine) = machine.upgrade() else { break };
        machine.apply_change(change);
      }
      subscription.close();
    });

    if let Some(previous) = self.listener.lock().replace(task) {
      previous.abort();
    }
  }

  /// Closes the realtime subscription. Safe to call more than once.
  pub fn teardown(&self) {
    if let Some(task) = self.listener.lock().take() {
      debug!("Closing order subscription.");
      task.abort();
    }
  }

  /// Handles one realtime notification for the watched order.
  pub fn apply_change(&self, change: OrderChange) -> ChangeOutcome {
    if self.ctx.read().order_id() != Some(change.order_id.as_str()) {
      return ChangeOutcome::Ignored;
    }
    match change.status {
      OrderStatus::Processing => {
        if self.settle(Notice::success("Payment confirmed! Your order is being prepared.")) {
          ChangeOutcome::Settled
        } else {
          ChangeOutcome::AlreadySettled
        }
      }
      OrderStatus::Cancelled => {
        self.abandon_cancelled();
        ChangeOutcome::Cancelled
      }
      _ => ChangeOutcome::Ignored,
    }
  }

  // --- User actions ---

  pub fn select_method(&self, method: PaymentMethod) {
    self.ctx.write().selected_method = Some(method);
  }

  #[instrument(name = "checkout::submit_payment", skip(self))]
  pub async fn submit_payment(&self) -> SubmitOutcome {
    let Some(_processing) = self.ctx.try_begin_processing() else {
      return SubmitOutcome::Busy;
    };
    if self.is_cancelled() {
      return SubmitOutcome::OrderCancelled;
    }

    let (order, method) = {
      let state = self.ctx.read();
      if state.payment_state != PaymentState::Selection {
        return SubmitOutcome::Ignored;
      }
      (state.pending_order.clone(), state.selected_method)
    };
    let Some(order) = order else {
      return SubmitOutcome::Ignored;
    };
    let Some(method) = method else {
      self.deps.notifier.notify(Notice::error("Please choose a payment method."));
      return SubmitOutcome::NoMethodSelected;
    };

    match self.run_submit(&order, method).await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(error = %e, order_id = %order.order_id, method = method.as_str(), "Payment submission failed.");
        self.deps.notifier.notify(Notice::error(GENERIC_PAYMENT_ERROR));
        SubmitOutcome::Failed
      }
    }
  }

  async fn run_submit(&self, order: &PendingOrder, method: PaymentMethod) -> CheckoutResult<SubmitOutcome> {
    let row = self.timed("order status", self.deps.orders.fetch_order(&order.order_id)).await?;
    if row.status.is_cancelled() {
      self.abandon_cancelled();
      return Ok(SubmitOutcome::OrderCancelled);
    }

    match method {
      PaymentMethod::Qris => {
        let request = CreatePaymentRequest {
          amount: order.total,
          order_id: order.order_id.clone(),
          customer_name: non_empty(row.customer_name).unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()),
          customer_phone: Some(non_empty(row.customer_phone).unwrap_or_else(|| DEFAULT_CUSTOMER_PHONE.to_string())),
        };
        let data = match self.timed("QRIS creation", self.deps.gateway.create_payment(request)).await? {
          CreatePaymentOutcome::Created(data) => data,
          CreatePaymentOutcome::Rejected(rejection) => {
            warn!(code = ?rejection.code, message = %rejection.message, "QRIS creation rejected.");
            self.deps.notifier.notify(Notice::error(rejection.message.clone()));
            return Ok(SubmitOutcome::Rejected(rejection.message));
          }
        };

        self
          .timed("order update", self.deps.orders.update_order(&order.order_id, OrderPatch::attach_qris(data.clone())))
          .await?;

        let mut state = self.ctx.write();
        if self.is_cancelled() || state.payment_state == PaymentState::Success {
          return Ok(SubmitOutcome::Ignored);
        }
        info!(order_id = %order.order_id, transaction_id = %data.transaction_id, "QRIS session created.");
        state.qris_data = Some(data);
        state.payment_state = PaymentState::QrisWaiting;
        Ok(SubmitOutcome::AwaitingQris)
      }
      PaymentMethod::Cod => {
        self
          .timed("order update", self.deps.orders.update_order(&order.order_id, OrderPatch::mark_processing(PaymentMethod::Cod)))
          .await?;
        if !self.settle(Notice::success("Order placed! Please pay at the counter.")) {
          return Ok(SubmitOutcome::Ignored);
        }
        Ok(SubmitOutcome::Completed)
      }
    }
  }

  #[instrument(name = "checkout::check_status", skip(self))]
  pub async fn check_status(&self) -> StatusCheckOutcome {
    let (transaction_id, order_id) = {
      let state = self.ctx.read();
      match (&state.qris_data, state.order_id()) {
        (Some(data), Some(order_id)) => (data.transaction_id.clone(), order_id.to_string()),
        _ => return StatusCheckOutcome::NotReady,
      }
    };
    let Some(_processing) = self.ctx.try_begin_processing() else {
      return StatusCheckOutcome::Busy;
    };

    match self.run_status_check(&order_id, &transaction_id).await {
      Ok(outcome) => outcome,
      Err(e) => {
        error!(error = %e, order_id = %order_id, transaction_id = %transaction_id, "Payment status check failed.");
        self.deps.notifier.notify(Notice::error(GENERIC_STATUS_ERROR));
        StatusCheckOutcome::Failed
      }
    }
  }

  async fn run_status_check(&self, order_id: &str, transaction_id: &str) -> CheckoutResult<StatusCheckOutcome> {
    let row = self.timed("order status", self.deps.orders.fetch_order(order_id)).await?;
    match row.status {
      OrderStatus::Cancelled => {
        self.cancelled.store(true, Ordering::SeqCst);
        self.deps.notifier.notify(Notice::error(CANCELLED_WHILE_PAYING_NOTICE));
        return Ok(StatusCheckOutcome::OrderCancelled);
      }
      OrderStatus::Completed => {
        self.settle(Notice::success("Your order is already completed."));
        return Ok(StatusCheckOutcome::Completed);
      }
      _ => {}
    }

    match self.timed("payment status", self.deps.gateway.check_status(transaction_id)).await? {
      PaymentStatusOutcome::Reported(PaymentStatus::Paid) => {
        self
          .timed("order update", self.deps.orders.update_order(order_id, OrderPatch::mark_processing(PaymentMethod::Qris)))
          .await?;
        self.settle(Notice::success("Payment successful! Your order is being prepared."));
        Ok(StatusCheckOutcome::Paid)
      }
      PaymentStatusOutcome::Reported(PaymentStatus::Pending) => {
        self
          .deps
          .notifier
          .notify(Notice::info("Payment not detected yet. Complete the payment, then check again."));
        Ok(StatusCheckOutcome::Pending)
      }
      PaymentStatusOutcome::Reported(PaymentStatus::Other(status)) => {
        self.deps.notifier.notify(Notice::error(format!("Payment status: {status}")));
        Ok(StatusCheckOutcome::Unpaid(status))
      }
      PaymentStatusOutcome::Rejected(rejection) => {
        self.deps.notifier.notify(Notice::error(rejection.message.clone()));
        Ok(StatusCheckOutcome::Unpaid(rejection.message))
      }
    }
  }

  #[instrument(name = "checkout::download_qr", skip(self))]
  pub async fn download_qr(&self) -> DownloadOutcome {
    let (qris_url, order_id) = {
      let state = self.ctx.read();
      match (&state.qris_data, state.order_id()) {
        (Some(data), Some(order_id)) if !data.qris_url.is_empty() => (data.qris_url.clone(), order_id.to_string()),
        _ => return DownloadOutcome::Skipped,
      }
    };
    save_qr_image(
      &qris_url,
      &order_id,
      self.deps.images.as_ref(),
      self.deps.platform.as_ref(),
      self.deps.notifier.as_ref(),
      self.config.request_timeout,
    )
    .await
  }

  // --- Terminal transitions ---

  /// Moves to `Success` and clears the handoff. Returns false when already
  /// settled or cancelled.
  fn settle(&self, notice: Notice) -> bool {
    {
      let mut state = self.ctx.write();
      if self.is_cancelled() || state.payment_state == PaymentState::Success {
        return false;
      }
      state.payment_state = PaymentState::Success;
    }
    info!(order_id = ?self.ctx.read().order_id(), "Checkout settled.");
    self.deps.storage.remove(PENDING_ORDER_KEY);
    self.deps.notifier.notify(notice);
    true
  }

  /// The order is cancelled: notify, drop the handoff and leave the page.
  fn abandon_cancelled(&self) {
    self.cancelled.store(true, Ordering::SeqCst);
    warn!(order_id = ?self.ctx.read().order_id(), "Order cancelled; leaving checkout.");
    self.deps.notifier.notify(Notice::error(CANCELLED_NOTICE));
    self.deps.storage.remove(PENDING_ORDER_KEY);
    self.deps.navigator.navigate(&self.config.home_route);
  }

  async fn timed<T>(&self, operation: &'static str, fut: impl Future<Output = CheckoutResult<T>>) -> CheckoutResult<T> {
    tokio::time::timeout(self.config.request_timeout, fut)
      .await
      .map_err(|_| CheckoutError::Timeout { operation })?
  }
}

impl Drop for CheckoutMachine {
  fn drop(&mut self) {
    self.teardown();
  }
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}
