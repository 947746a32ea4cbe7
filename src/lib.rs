//! Fleet Gateway Library
//!
//! Resilience layer for a fleet-management API gateway: per-service circuit
//! breakers, a breaker-guarded proxy dispatcher, and an active health monitor.

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::GatewayConfig;
pub use error::{GatewayError, UpstreamError};
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
