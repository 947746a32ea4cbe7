//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

/// Delay before retry attempt `attempt` (1-based), doubling from `base_ms`
/// up to `max_ms`, with up to 10% jitter to avoid synchronized retries.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential = 2u64.saturating_pow(attempt.saturating_sub(1));
    let delay_ms = base_ms.saturating_mul(exponential).min(max_ms);

    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}
