//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (path, method, headers, body)
//!     → registry.rs (longest-prefix lookup: which service?)
//!     → rewrite.rs (compute the upstream path)
//!     → dispatcher.rs (breaker-guarded forward, retries, 503 envelope)
//! ```
//!
//! # Design Decisions
//! - Registry built once at startup, immutable at runtime
//! - One circuit breaker per service, owned by its registry entry
//! - Explicit no-match rather than a silent default service

pub mod dispatcher;
pub mod registry;
pub mod rewrite;

pub use dispatcher::{unavailable_response, Dispatcher};
pub use registry::{ServiceEntry, ServiceRegistry};
pub use rewrite::rewrite_path;
