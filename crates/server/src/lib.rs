//! Fitness Predictor - HTTP prediction service
//!
//! Loads model and scaler artifacts at startup and serves performance-score
//! and calorie-burn predictions over HTTP.

pub mod api;
pub mod config;

pub use api::{create_router, serve, AppState};
pub use config::ServerConfig;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
