pub mod config;
pub mod http_client;
pub mod server;

pub mod common;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod stores;
pub mod upstream;

pub use config::GatewayConfig;
