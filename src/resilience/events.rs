//! Breaker state-change events.
//!
//! # Design Decisions
//! - Explicit subscription via a broadcast channel: `subscribe()` hands out a
//!   receiver, dropping it unsubscribes. No hidden listener registration order
//! - Events are fire-and-forget; a lagging subscriber never blocks a breaker

use std::time::SystemTime;

use tokio::sync::broadcast;

/// What happened on a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerEventKind {
    /// CLOSED → OPEN, or a failed probe re-opened the circuit.
    Open,
    /// A successful probe closed the circuit.
    Close,
    /// The cool-down elapsed and a probe was admitted.
    HalfOpen,
    /// A call was short-circuited without reaching the network.
    Fallback,
}

impl std::fmt::Display for BreakerEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Close => write!(f, "close"),
            Self::HalfOpen => write!(f, "halfOpen"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A single breaker event, delivered to every live subscriber.
#[derive(Debug, Clone)]
pub struct BreakerEvent {
    pub service: String,
    pub kind: BreakerEventKind,
    pub timestamp: SystemTime,
}

impl BreakerEvent {
    pub fn now(service: &str, kind: BreakerEventKind) -> Self {
        Self {
            service: service.to_string(),
            kind,
            timestamp: SystemTime::now(),
        }
    }
}

/// Per-breaker event fan-out.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<BreakerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to future events. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<BreakerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; silently dropped when nobody listens.
    pub fn publish(&self, event: BreakerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
