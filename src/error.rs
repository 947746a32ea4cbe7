//! Error taxonomy for the gateway.
//!
//! # Design Decisions
//! - Transport failures and timeouts are the only breaker-counted failures
//! - Upstream HTTP statuses are not errors at the proxy layer; `Status` exists
//!   for callers that surface application statuses as errors (the default
//!   429 filter matches on it)
//! - Error detail is logged, never leaked into client responses

use std::time::Duration;
use thiserror::Error;

/// A classified failure from a downstream call.
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// The call did not complete before its deadline.
    #[error("upstream call timed out after {after:?}")]
    Timeout { after: Duration },

    /// Connection refused, reset, or otherwise failed at the transport layer.
    #[error("upstream connection failed: {0}")]
    Connection(String),

    /// The downstream answered with an HTTP status the caller treats as an error.
    #[error("upstream returned status {status}")]
    Status { status: u16 },

    /// Anything else (malformed response, body read failure).
    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    /// HTTP status carried by this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            UpstreamError::Status { status } => Some(*status),
            _ => None,
        }
    }
}

/// Errors surfaced by a circuit-breaker-guarded call.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The breaker rejected the call without attempting it.
    #[error("service '{service}' circuit is open")]
    CircuitOpen { service: String },

    /// The call was attempted and failed.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl GatewayError {
    /// Returns true if this error is a breaker short-circuit.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GatewayError::CircuitOpen { .. })
    }
}
