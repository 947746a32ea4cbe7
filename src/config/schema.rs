//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the fleet gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, outer timeout).
    pub listener: ListenerConfig,

    /// Downstream service definitions (one breaker + dispatcher pair each).
    pub services: Vec<ServiceConfig>,

    /// Health monitor settings.
    pub health_check: HealthCheckConfig,

    /// Retry backoff settings (attempt counts are per service).
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Outer request timeout in seconds, a backstop above per-service deadlines.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// A downstream service behind the gateway.
///
/// Every field needed to construct its breaker + dispatcher pair lives here;
/// the configuration is immutable once loaded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Unique service identifier (e.g., "vehicle", "maintenance").
    pub name: String,

    /// Base URL requests are forwarded to (e.g., "http://vehicle-svc:3001").
    pub base_url: String,

    /// Inbound path prefix routed to this service (e.g., "/api/vehicles").
    pub path_prefix: String,

    /// Ordered prefix-replace rules applied to the inbound path before
    /// forwarding. First matching rule wins; no match forwards unchanged.
    #[serde(default)]
    pub path_rewrite: Vec<RewriteRule>,

    /// Per-call deadline in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Max attempts for idempotent requests (1 = no retry).
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Failure percentage at which the breaker opens.
    #[serde(default = "default_error_threshold")]
    pub error_threshold_percentage: u8,

    /// Cool-down before an open breaker admits a probe, in milliseconds.
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Sliding window span for failure accounting, in milliseconds.
    #[serde(default = "default_rolling_window_ms")]
    pub rolling_window_ms: u64,

    /// Number of buckets the rolling window is partitioned into.
    #[serde(default = "default_bucket_count")]
    pub bucket_count: usize,

    /// Minimum requests in the window before the breaker may open.
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u32,
}

/// A single path rewrite rule: replace a leading `from` with `to`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RewriteRule {
    pub from: String,
    pub to: String,
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_retries() -> u32 {
    3
}

fn default_error_threshold() -> u8 {
    50
}

fn default_reset_timeout_ms() -> u64 {
    30_000
}

fn default_rolling_window_ms() -> u64 {
    10_000
}

fn default_bucket_count() -> usize {
    10
}

fn default_volume_threshold() -> u32 {
    10
}

/// Health monitor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Enable the active health monitor.
    pub enabled: bool,

    /// Interval between probe rounds in milliseconds.
    pub interval_ms: u64,

    /// Per-probe timeout in milliseconds.
    pub timeout_ms: u64,

    /// Path probed on each service's base URL.
    pub path: String,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 30_000,
            timeout_ms: 2_000,
            path: "/health".to_string(),
        }
    }
}

/// Retry backoff configuration, shared across services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Enable retries for idempotent requests.
    pub enabled: bool,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Largest request body buffered to make replays possible, in bytes.
    /// Bodies above this size are forwarded once, without retry.
    pub max_buffered_body_bytes: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
            max_buffered_body_bytes: 1024 * 1024,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
