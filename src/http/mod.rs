//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (ensure request ID)
//!     → proxy handler (registry lookup → breaker-guarded dispatch)
//!     → response to client (passthrough or 503 envelope)
//! ```

pub mod request;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::{AppState, GatewayServer};
