// app/src/lib.rs

//! Server side of the Kopi ordering app: the QRIS and WhatsApp provider
//! proxies, the image proxy, and the page navigation guard.

pub mod config;
pub mod errors;
pub mod services;
pub mod state;
pub mod web;
