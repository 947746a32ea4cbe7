//! Retry policy.
//!
//! # Responsibilities
//! - Decide whether a request may be retried (idempotent methods only)
//! - Bound the attempt count per logical call
//!
//! # Design Decisions
//! - Never retry POST/PUT/DELETE/PATCH
//! - Retries happen inside a single breaker attempt; the breaker observes one
//!   outcome per logical call, never one per sub-attempt
//! - Only transport-level failures are retried; an HTTP status is a final
//!   answer and is passed through

use axum::http::Method;

/// Methods safe to replay against the downstream.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Attempts allowed for one logical call: the service's configured count for
/// replayable idempotent requests when retries are enabled, otherwise one.
pub fn max_attempts(
    enabled: bool,
    service_retries: u32,
    method: &Method,
    body_replayable: bool,
) -> u32 {
    if enabled && body_replayable && is_idempotent(method) {
        service_retries.max(1)
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_classification() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::HEAD));
        assert!(is_idempotent(&Method::OPTIONS));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PUT));
        assert!(!is_idempotent(&Method::DELETE));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[test]
    fn test_non_idempotent_gets_single_attempt() {
        assert_eq!(max_attempts(true, 3, &Method::POST, true), 1);
        assert_eq!(max_attempts(true, 3, &Method::GET, true), 3);
    }

    #[test]
    fn test_unreplayable_body_disables_retry() {
        assert_eq!(max_attempts(true, 3, &Method::GET, false), 1);
    }

    #[test]
    fn test_disabled_retries_give_single_attempt() {
        assert_eq!(max_attempts(false, 5, &Method::GET, true), 1);
        assert_eq!(max_attempts(true, 0, &Method::GET, true), 1);
    }
}
