//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup: load config → validate → build registry/monitor → serve
//! Shutdown: signal → stop accepting → await health monitor → exit
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
