// src/lib.rs

//! Kopi checkout: the client-side checkout and payment flow of the Kopi
//! coffee-shop ordering app.
//!
//! It provides:
//!  - A checkout state machine driving `selection → qris_waiting → success`,
//!    with a realtime order-status subscription and cancellation guards.
//!  - A QR expiry countdown that stops itself once elapsed.
//!  - Best-effort QR image saving (share, download, open).
//!  - Render-ready view models for the checkout screens.
//!  - Typed payloads for the QRIS payment proxy, shared with the server.
//!  - Phone number normalization and customer message templates for the
//!    messaging gateway.

pub mod download;
pub mod error;
pub mod gateway;
pub mod machine;
pub mod messages;
pub mod order;
pub mod phone;
pub mod ports;
pub mod state;
pub mod timer;
pub mod view;

// --- Re-exports for the Public API ---

pub use crate::download::DownloadOutcome;
pub use crate::error::{CheckoutError, CheckoutResult};
pub use crate::gateway::{
  CreatePaymentOutcome, CreatePaymentRequest, GatewayRejection, PaymentGateway, PaymentStatus, PaymentStatusOutcome,
  QrisData,
};
pub use crate::machine::{
  ChangeOutcome, CheckoutConfig, CheckoutDeps, CheckoutMachine, MountOutcome, StatusCheckOutcome, SubmitOutcome,
};
pub use crate::order::{
  Amount, OrderChange, OrderItem, OrderPatch, OrderRow, OrderStatus, OrderType, PaymentMethod, PendingOrder,
  PENDING_ORDER_KEY,
};
pub use crate::ports::{
  FetchedImage, FileShare, ImageFetcher, LocalStore, Navigator, Notice, NoticeLevel, Notifier, OrderStore,
  OrderSubscription, QrFile, SavePlatform, ShareError,
};
pub use crate::state::{CheckoutContext, CheckoutState, PaymentState};
pub use crate::timer::{countdown, Countdown, ExpiryTimer};
pub use crate::view::CheckoutView;
