pub mod auth;
pub mod core;
pub mod services;
pub mod ufw;
