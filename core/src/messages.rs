// core/src/messages.rs

//! Customer notification texts sent through the WhatsApp gateway.

use serde::Deserialize;

const SHOP_NAME: &str = "Kopi Kita";

/// Short, human-friendly order reference: `#` + first 8 characters, upper-cased.
pub fn order_reference(order_id: &str) -> String {
  let short: String = order_id.chars().take(8).collect();
  format!("#{}", short.to_uppercase())
}

fn greeting(customer_name: &str) -> String {
  let name = customer_name.trim();
  if name.is_empty() {
    "Halo!".to_string()
  } else {
    format!("Halo, {name}!")
  }
}

pub fn pickup_ready_message(customer_name: &str, order_id: &str) -> String {
  format!(
    "{}\n\nPesanan {} kamu sudah siap diambil di {}.\nTunjukkan pesan ini ke kasir saat pengambilan.\n\nTerima kasih! ☕",
    greeting(customer_name),
    order_reference(order_id),
    SHOP_NAME,
  )
}

pub fn delivery_message(customer_name: &str, order_id: &str, address: &str) -> String {
  let address = address.trim();
  let destination = if address.is_empty() {
    String::new()
  } else {
    format!("\nAlamat tujuan: {address}")
  };
  format!(
    "{}\n\nPesanan {} kamu sedang dalam perjalanan.{}\nMohon pastikan nomor ini bisa dihubungi kurir.\n\nTerima kasih sudah memesan di {}! ☕",
    greeting(customer_name),
    order_reference(order_id),
    destination,
    SHOP_NAME,
  )
}

pub fn cancellation_message(customer_name: &str, order_id: &str, reason: Option<&str>) -> String {
  let reason_line = match reason.map(str::trim).filter(|r| !r.is_empty()) {
    Some(reason) => format!("\nAlasan: {reason}"),
    None => String::new(),
  };
  format!(
    "{}\n\nMohon maaf, pesanan {} kamu telah dibatalkan.{}\nJika sudah melakukan pembayaran, silakan hubungi kami untuk pengembalian dana.\n\n{}",
    greeting(customer_name),
    order_reference(order_id),
    reason_line,
    SHOP_NAME,
  )
}

/// Order lifecycle events an admin can notify a customer about.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
  PickupReady,
  Delivery {
    #[serde(default)]
    address: String,
  },
  Cancelled {
    #[serde(default)]
    reason: Option<String>,
  },
}

impl NotificationEvent {
  pub fn render(&self, customer_name: &str, order_id: &str) -> String {
    match self {
      NotificationEvent::PickupReady => pickup_ready_message(customer_name, order_id),
      NotificationEvent::Delivery { address } => delivery_message(customer_name, order_id, address),
      NotificationEvent::Cancelled { reason } => cancellation_message(customer_name, order_id, reason.as_deref()),
    }
  }
}
