//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! monitor.rs:
//!     periodic timer (non-overlapping ticks)
//!     → concurrent GET <base_url>/health per service
//!     → status.rs (record result, detect transition)
//!     → transition logs + health gauge
//! ```
//!
//! # Design Decisions
//! - Purely advisory: the circuit breaker never reads this state
//! - Transitions logged once per flip, never repeated for sustained status

pub mod monitor;
pub mod status;

pub use monitor::{HealthMonitor, HealthMonitorHandle};
pub use status::{HealthBoard, HealthTransition, ServiceHealthStatus};
