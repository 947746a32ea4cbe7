//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to a downstream service:
//!     → breaker.rs (admission: fail fast while the circuit is open)
//!     → retry.rs / backoff.rs (idempotent retries inside one breaker attempt)
//!     → breaker.rs (record the single logical outcome, maybe transition)
//!     → events.rs (publish open/close/halfOpen/fallback to subscribers)
//! ```
//!
//! # Design Decisions
//! - Every external call has a deadline; timeouts are counted failures
//! - Failure rate is computed over a bucketed sliding window
//! - Retries only for idempotent requests, and only below the breaker's
//!   accounting granularity
//! - Rate-limit rejections (429) are excluded from failure accounting by the
//!   default error filter

pub mod backoff;
pub mod breaker;
pub mod events;
pub mod retry;

pub use backoff::calculate_backoff;
pub use breaker::{
    default_error_filter, BreakerConfig, CircuitBreaker, CircuitState, ErrorFilter,
    WindowSnapshot,
};
pub use events::{BreakerEvent, BreakerEventKind, EventBus};
pub use retry::{is_idempotent, max_attempts};
