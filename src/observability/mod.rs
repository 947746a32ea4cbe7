//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → log aggregation (stdout)
//!     → Prometheus scrape of the metrics listener
//! ```
//!
//! # Design Decisions
//! - Breaker events reach metrics through the explicit subscription interface,
//!   not through callbacks registered inside the breaker

pub mod logging;
pub mod metrics;
