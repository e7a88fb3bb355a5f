// app/src/web/handlers/mod.rs

pub mod image_handlers;
pub mod qris_handlers;
pub mod whatsapp_handlers;
