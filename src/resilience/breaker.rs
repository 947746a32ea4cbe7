//! Circuit breaker for downstream service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: testing if the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure ratio over the rolling window crosses the threshold
//!                (once volume_threshold requests have been observed)
//! Open → Half-Open: after reset_timeout, the next call becomes the probe
//! Half-Open → Closed: probe succeeds (window is zeroed)
//! Half-Open → Open: probe fails
//! ```
//!
//! # Design Decisions
//! - Per-service breaker (not global)
//! - Failure rate computed over a bucketed sliding window, not consecutive counts
//! - Single probe in Half-Open (prevents hammering a recovering service)
//! - Mutations happen under a sync mutex never held across an await point, so
//!   outcome recording is linearizable per breaker

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::time;

use crate::error::{GatewayError, UpstreamError};
use crate::resilience::events::{BreakerEvent, BreakerEventKind, EventBus};

/// The current state of a circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Predicate deciding whether a failure is excluded from breaker accounting.
/// Returning `true` means the error counts as neither success nor failure;
/// it is still propagated to the caller unchanged.
pub type ErrorFilter = Arc<dyn Fn(&UpstreamError) -> bool + Send + Sync>;

/// Default filter: exclude rate-limit rejections (HTTP 429). Matches on the
/// typed status code rather than substring-searching the message.
pub fn default_error_filter() -> ErrorFilter {
    Arc::new(|err: &UpstreamError| err.status_code() == Some(429))
}

/// Immutable per-breaker configuration.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Deadline applied to every invoked call.
    pub timeout: Duration,
    /// Failure percentage at which the circuit opens (1..=100).
    pub error_threshold_percentage: u8,
    /// Cool-down before an open circuit admits a probe.
    pub reset_timeout: Duration,
    /// Total span of the sliding failure-accounting window.
    pub rolling_window: Duration,
    /// Number of buckets the window is partitioned into.
    pub bucket_count: usize,
    /// Minimum requests in the window before the circuit may open.
    pub volume_threshold: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            error_threshold_percentage: 50,
            reset_timeout: Duration::from_millis(30_000),
            rolling_window: Duration::from_millis(10_000),
            bucket_count: 10,
            volume_threshold: 10,
        }
    }
}

/// One slice of the rolling window.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    success: u32,
    failure: u32,
    started_at: Instant,
}

impl Bucket {
    fn fresh(started_at: Instant) -> Self {
        Self {
            success: 0,
            failure: 0,
            started_at,
        }
    }
}

/// Aggregate counts currently inside the rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub successes: u32,
    pub failures: u32,
}

impl WindowSnapshot {
    pub fn total(&self) -> u32 {
        self.successes + self.failures
    }
}

/// Fixed-length bucket sequence; newest bucket at the back.
#[derive(Debug)]
struct Window {
    buckets: VecDeque<Bucket>,
    width: Duration,
}

impl Window {
    fn new(bucket_count: usize, rolling_window: Duration, now: Instant) -> Self {
        let width = rolling_window / bucket_count as u32;
        let mut buckets = VecDeque::with_capacity(bucket_count);
        // The window always holds bucket_count buckets; older slots start
        // staggered into the past so the invariant holds from the first call.
        for i in (0..bucket_count).rev() {
            let started_at = now.checked_sub(width * i as u32).unwrap_or(now);
            buckets.push_back(Bucket::fresh(started_at));
        }
        Self { buckets, width }
    }

    /// Advance the window to `now`, evicting buckets that fell out of the
    /// lookback. Must run before any threshold evaluation so stale data never
    /// influences decisions.
    fn rotate(&mut self, now: Instant) {
        let newest_start = match self.buckets.back() {
            Some(b) => b.started_at,
            None => return,
        };
        let elapsed = now.saturating_duration_since(newest_start);
        let steps = (elapsed.as_nanos() / self.width.as_nanos().max(1)) as usize;
        if steps == 0 {
            return;
        }

        let count = self.buckets.len();
        if steps >= count {
            // Everything in the window is stale.
            self.reset(now);
            return;
        }
        for i in 0..steps {
            self.buckets.pop_front();
            self.buckets
                .push_back(Bucket::fresh(newest_start + self.width * (i as u32 + 1)));
        }
    }

    fn record_success(&mut self) {
        if let Some(bucket) = self.buckets.back_mut() {
            bucket.success += 1;
        }
    }

    fn record_failure(&mut self) {
        if let Some(bucket) = self.buckets.back_mut() {
            bucket.failure += 1;
        }
    }

    fn reset(&mut self, now: Instant) {
        let count = self.buckets.len();
        let width = self.width;
        self.buckets.clear();
        for i in (0..count).rev() {
            let started_at = now.checked_sub(width * i as u32).unwrap_or(now);
            self.buckets.push_back(Bucket::fresh(started_at));
        }
    }

    fn snapshot(&self) -> WindowSnapshot {
        let mut snap = WindowSnapshot {
            successes: 0,
            failures: 0,
        };
        for bucket in &self.buckets {
            snap.successes += bucket.success;
            snap.failures += bucket.failure;
        }
        snap
    }
}

/// Mutable breaker state, guarded by a sync mutex.
#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    window: Window,
    last_transition: Instant,
    probe_in_flight: bool,
}

/// How a call was admitted through the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Normal closed-state traffic.
    Pass,
    /// The single half-open trial call.
    Probe,
}

/// A circuit breaker guarding calls to one downstream service.
pub struct CircuitBreaker {
    service: String,
    config: BreakerConfig,
    filter: ErrorFilter,
    core: Mutex<BreakerCore>,
    events: EventBus,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("service", &self.service)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a breaker with the default error filter (429 excluded).
    pub fn new(service: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_filter(service, config, default_error_filter())
    }

    /// Create a breaker with a custom error filter.
    pub fn with_filter(
        service: impl Into<String>,
        config: BreakerConfig,
        filter: ErrorFilter,
    ) -> Self {
        let now = Instant::now();
        Self {
            service: service.into(),
            core: Mutex::new(BreakerCore {
                state: CircuitState::Closed,
                window: Window::new(config.bucket_count, config.rolling_window, now),
                last_transition: now,
                probe_in_flight: false,
            }),
            config,
            filter,
            events: EventBus::default(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Pollable state accessor.
    pub fn state(&self) -> CircuitState {
        self.core.lock().unwrap().state
    }

    /// Aggregate success/failure counts currently in the rolling window.
    pub fn window_snapshot(&self) -> WindowSnapshot {
        let mut core = self.core.lock().unwrap();
        core.window.rotate(Instant::now());
        core.window.snapshot()
    }

    /// Subscribe to state-change and fallback events.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.events.subscribe()
    }

    /// Run `call` through the breaker under the configured deadline.
    ///
    /// The call is never invoked while the circuit is open within its
    /// cool-down, or while another half-open probe is outstanding; those
    /// rejections return [`GatewayError::CircuitOpen`] without touching any
    /// counter.
    pub async fn execute<T, F, Fut>(&self, call: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let admission = self.admit()?;
        let mut probe_guard = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };

        let outcome = match time::timeout(self.config.timeout, call()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(UpstreamError::Timeout {
                after: self.config.timeout,
            }),
        };
        probe_guard.armed = false;

        match outcome {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) if (self.filter)(&err) => {
                self.record_filtered();
                Err(err.into())
            }
            Err(err) => {
                self.record_failure();
                Err(err.into())
            }
        }
    }

    /// Decide whether a call may proceed, transitioning Open → Half-Open when
    /// the cool-down has elapsed.
    fn admit(&self) -> Result<Admission, GatewayError> {
        let now = Instant::now();
        let decision = {
            let mut core = self.core.lock().unwrap();
            core.window.rotate(now);
            match core.state {
                CircuitState::Closed => Ok((Admission::Pass, false)),
                CircuitState::Open => {
                    if now.saturating_duration_since(core.last_transition)
                        >= self.config.reset_timeout
                    {
                        core.state = CircuitState::HalfOpen;
                        core.last_transition = now;
                        core.probe_in_flight = true;
                        Ok((Admission::Probe, true))
                    } else {
                        Err(())
                    }
                }
                CircuitState::HalfOpen => {
                    if core.probe_in_flight {
                        Err(())
                    } else {
                        core.probe_in_flight = true;
                        Ok((Admission::Probe, false))
                    }
                }
            }
        };

        match decision {
            Ok((admission, transitioned)) => {
                if transitioned {
                    tracing::info!(service = %self.service, "circuit half-open, admitting probe");
                    self.publish(BreakerEventKind::HalfOpen);
                }
                Ok(admission)
            }
            Err(()) => {
                self.publish(BreakerEventKind::Fallback);
                Err(GatewayError::CircuitOpen {
                    service: self.service.clone(),
                })
            }
        }
    }

    fn record_success(&self) {
        let now = Instant::now();
        let closed = {
            let mut core = self.core.lock().unwrap();
            core.window.rotate(now);
            core.window.record_success();
            if core.state == CircuitState::HalfOpen {
                core.state = CircuitState::Closed;
                core.last_transition = now;
                core.probe_in_flight = false;
                core.window.reset(now);
                true
            } else {
                false
            }
        };
        if closed {
            tracing::info!(service = %self.service, "circuit closed after successful probe");
            self.publish(BreakerEventKind::Close);
        }
    }

    fn record_failure(&self) {
        let now = Instant::now();
        let opened = {
            let mut core = self.core.lock().unwrap();
            core.window.rotate(now);
            core.window.record_failure();
            match core.state {
                CircuitState::HalfOpen => {
                    core.state = CircuitState::Open;
                    core.last_transition = now;
                    core.probe_in_flight = false;
                    true
                }
                CircuitState::Closed => {
                    let snap = core.window.snapshot();
                    let total = snap.total();
                    let threshold_crossed = total >= self.config.volume_threshold
                        && u64::from(snap.failures) * 100
                            >= u64::from(self.config.error_threshold_percentage)
                                * u64::from(total);
                    if threshold_crossed {
                        core.state = CircuitState::Open;
                        core.last_transition = now;
                        true
                    } else {
                        false
                    }
                }
                CircuitState::Open => false,
            }
        };
        if opened {
            tracing::warn!(service = %self.service, "circuit opened");
            self.publish(BreakerEventKind::Open);
        }
    }

    /// A filtered failure counts as neither success nor failure. When it
    /// resolves a probe, the probe slot is released and the circuit stays
    /// half-open with no verdict.
    fn record_filtered(&self) {
        let mut core = self.core.lock().unwrap();
        core.window.rotate(Instant::now());
        if core.state == CircuitState::HalfOpen {
            core.probe_in_flight = false;
        }
    }

    fn publish(&self, kind: BreakerEventKind) {
        self.events.publish(BreakerEvent::now(&self.service, kind));
    }
}

/// Releases the half-open probe slot if the guarded call is cancelled before
/// its outcome is recorded, so a dropped probe future cannot wedge the
/// breaker in Half-Open forever.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut core = self.breaker.core.lock().unwrap();
            if core.state == CircuitState::HalfOpen {
                core.probe_in_flight = false;
            }
        }
    }
}
