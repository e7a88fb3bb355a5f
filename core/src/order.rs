// core/src/order.rs

//! Order data as seen by the checkout page: the pending order handed over by
//! the ordering flow, and the snapshot of the backend order row.

use crate::gateway::QrisData;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Local storage key under which the ordering flow leaves the pending order.
pub const PENDING_ORDER_KEY: &str = "pendingOrder";

/// Whole rupiah.
pub type Amount = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
  Pickup,
  Delivery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
  pub name: String,
  pub quantity: u32,
  pub price: Amount,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrder {
  pub order_id: String,
  pub items: Vec<OrderItem>,
  pub total: Amount,
  pub order_type: OrderType,
  #[serde(default)]
  pub address: Option<String>,
}

impl PendingOrder {
  /// Parses the raw local storage entry. Empty order ids count as unparsable.
  pub fn from_storage(raw: &str) -> Option<Self> {
    match serde_json::from_str::<PendingOrder>(raw) {
      Ok(order) if !order.order_id.trim().is_empty() => Some(order),
      Ok(_) => None,
      Err(e) => {
        tracing::warn!(error = %e, "Discarding unparsable pending order.");
        None
      }
    }
  }

  /// Sum of `price × quantity`. Display only; `total` is what gets charged.
  pub fn items_total(&self) -> Amount {
    self.items.iter().map(|i| i.price * Amount::from(i.quantity)).sum()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OrderStatus {
  #[default]
  Pending,
  Processing,
  Completed,
  Cancelled,
  Other(String),
}

impl OrderStatus {
  pub fn as_str(&self) -> &str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Processing => "processing",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Other(s) => s.as_str(),
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, OrderStatus::Cancelled)
  }
}

impl From<&str> for OrderStatus {
  fn from(value: &str) -> Self {
    match value {
      "" | "pending" => OrderStatus::Pending,
      "processing" => OrderStatus::Processing,
      "completed" => OrderStatus::Completed,
      "cancelled" => OrderStatus::Cancelled,
      other => OrderStatus::Other(other.to_string()),
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for OrderStatus {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for OrderStatus {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().map(OrderStatus::from).unwrap_or_default())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Qris,
  Cod,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Qris => "qris",
      PaymentMethod::Cod => "cod",
    }
  }
}

/// The columns of the backend order row the checkout page reads.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderRow {
  pub id: String,
  #[serde(default)]
  pub status: OrderStatus,
  #[serde(default)]
  pub payment_data: Option<QrisData>,
  #[serde(default)]
  pub payment_method: Option<PaymentMethod>,
  #[serde(default)]
  pub customer_name: Option<String>,
  #[serde(default)]
  pub customer_phone: Option<String>,
}

/// A partial update of the order row. Unset fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OrderPatch {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<OrderStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_data: Option<QrisData>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub payment_method: Option<PaymentMethod>,
}

impl OrderPatch {
  /// `{status: "processing", payment_method}`: the write that marks an order paid.
  pub fn mark_processing(method: PaymentMethod) -> Self {
    Self {
      status: Some(OrderStatus::Processing),
      payment_method: Some(method),
      ..Default::default()
    }
  }

  /// `{payment_data, payment_method: "qris"}`: persists a fresh QR session.
  pub fn attach_qris(data: QrisData) -> Self {
    Self {
      payment_data: Some(data),
      payment_method: Some(PaymentMethod::Qris),
      ..Default::default()
    }
  }
}

/// A realtime change notification for the watched order row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OrderChange {
  pub order_id: String,
  #[serde(default)]
  pub status: OrderStatus,
}
