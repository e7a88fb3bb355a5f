// app/src/web/mod.rs

pub mod auth;
pub mod guard;
pub mod handlers;
pub mod routes;

pub use guard::NavigationGuard;
pub use routes::configure_app_routes;
