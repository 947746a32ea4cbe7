//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; breaker/health state is rebuilt from it
//!   on every restart (nothing is persisted)
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    GatewayConfig, HealthCheckConfig, ListenerConfig, ObservabilityConfig, RetryConfig,
    RewriteRule, ServiceConfig,
};
pub use validation::{validate_config, ValidationError};
