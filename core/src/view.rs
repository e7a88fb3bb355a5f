// core/src/view.rs

//! Render-ready view models for the checkout screens. Stateless: everything
//! is derived from a [`CheckoutState`] snapshot and the current countdown.

use crate::order::{Amount, OrderType, PaymentMethod, PendingOrder};
use crate::state::{CheckoutState, PaymentState};
use crate::timer::Countdown;
use serde::Serialize;

/// `15000` → `Rp 15.000`.
pub fn format_rupiah(amount: Amount) -> String {
  let digits = amount.to_string();
  let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
  for (i, ch) in digits.chars().enumerate() {
    if i > 0 && (digits.len() - i) % 3 == 0 {
      grouped.push('.');
    }
    grouped.push(ch);
  }
  format!("Rp {grouped}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderLineView {
  pub name: String,
  pub quantity: u32,
  pub subtotal_label: String,
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSummaryView {
  pub order_id: String,
  pub order_type: OrderType,
  pub address: Option<String>,
  pub lines: Vec<OrderLineView>,
  pub total_label: String,
}

impl OrderSummaryView {
  pub fn from_order(order: &PendingOrder) -> Self {
    Self {
      order_id: order.order_id.clone(),
      order_type: order.order_type,
      address: match order.order_type {
        OrderType::Delivery => order.address.clone(),
        OrderType::Pickup => None,
      },
      lines: order
        .items
        .iter()
        .map(|item| OrderLineView {
          name: item.name.clone(),
          quantity: item.quantity,
          subtotal_label: format_rupiah(item.price * Amount::from(item.quantity)),
          note: item.note.clone(),
        })
        .collect(),
      total_label: format_rupiah(order.total),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethodOption {
  pub method: PaymentMethod,
  pub label: &'static str,
  pub description: &'static str,
  pub selected: bool,
}

pub fn payment_method_options(selected: Option<PaymentMethod>) -> Vec<PaymentMethodOption> {
  [
    (PaymentMethod::Qris, "QRIS", "Scan with any e-wallet or mobile banking app"),
    (PaymentMethod::Cod, "Pay at counter", "Pay with cash when you pick up or receive your order"),
  ]
  .into_iter()
  .map(|(method, label, description)| PaymentMethodOption {
    method,
    label,
    description,
    selected: selected == Some(method),
  })
  .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum CheckoutView {
  /// Before the pending order is loaded.
  Loading,
  Selection {
    summary: OrderSummaryView,
    methods: Vec<PaymentMethodOption>,
    can_pay: bool,
  },
  QrisWaiting {
    summary: OrderSummaryView,
    qris_url: String,
    transaction_id: String,
    countdown_label: String,
    is_expired: bool,
    can_download: bool,
    can_check_status: bool,
  },
  Success {
    order_id: String,
    method: Option<PaymentMethod>,
  },
}

impl CheckoutView {
  pub fn from_state(state: &CheckoutState, countdown: Option<Countdown>) -> Self {
    let Some(order) = &state.pending_order else {
      return CheckoutView::Loading;
    };

    match (state.payment_state, &state.qris_data) {
      (PaymentState::Success, _) => CheckoutView::Success {
        order_id: order.order_id.clone(),
        method: state.selected_method,
      },
      (PaymentState::QrisWaiting, Some(qris)) => {
        let is_expired = countdown.is_some_and(|c| c.is_expired());
        CheckoutView::QrisWaiting {
          summary: OrderSummaryView::from_order(order),
          qris_url: qris.qris_url.clone(),
          transaction_id: qris.transaction_id.clone(),
          countdown_label: countdown.map(|c| c.label()).unwrap_or_default(),
          is_expired,
          can_download: !is_expired,
          can_check_status: !is_expired && !state.is_processing,
        }
      }
      _ => CheckoutView::Selection {
        summary: OrderSummaryView::from_order(order),
        methods: payment_method_options(state.selected_method),
        can_pay: state.selected_method.is_some() && !state.is_processing,
      },
    }
  }
}
