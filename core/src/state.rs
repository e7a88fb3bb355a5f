// core/src/state.rs

use crate::gateway::QrisData;
use crate::order::{PaymentMethod, PendingOrder};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::Serialize;
use std::sync::Arc;

/// Which checkout screen is showing. `Success` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
  #[default]
  Selection,
  QrisWaiting,
  Success,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckoutState {
  pub payment_state: PaymentState,
  pub selected_method: Option<PaymentMethod>,
  pub is_processing: bool,
  pub pending_order: Option<PendingOrder>,
  pub qris_data: Option<QrisData>,
}

impl CheckoutState {
  pub fn order_id(&self) -> Option<&str> {
    self.pending_order.as_ref().map(|o| o.order_id.as_str())
  }
}

/// Shared handle to the checkout state.
///
/// Guards are blocking and MUST be dropped before any `.await`.
#[derive(Debug, Clone, Default)]
pub struct CheckoutContext(Arc<RwLock<CheckoutState>>);

impl CheckoutContext {
  pub fn new(state: CheckoutState) -> Self {
    CheckoutContext(Arc::new(RwLock::new(state)))
  }

  pub fn read(&self) -> RwLockReadGuard<'_, CheckoutState> {
    self.0.read()
  }

  pub fn write(&self) -> RwLockWriteGuard<'_, CheckoutState> {
    self.0.write()
  }

  pub fn snapshot(&self) -> CheckoutState {
    self.read().clone()
  }

  pub fn payment_state(&self) -> PaymentState {
    self.read().payment_state
  }

  /// Claims the processing flag. `None` when another action already holds it.
  pub fn try_begin_processing(&self) -> Option<ProcessingGuard> {
    let mut state = self.write();
    if state.is_processing {
      return None;
    }
    state.is_processing = true;
    Some(ProcessingGuard { ctx: self.clone() })
  }
}

/// Clears `is_processing` when dropped, on every exit path.
#[derive(Debug)]
pub struct ProcessingGuard {
  ctx: CheckoutContext,
}

impl Drop for ProcessingGuard {
  fn drop(&mut self) {
    self.ctx.write().is_processing = false;
  }
}
