//! Service registry.
//!
//! # Responsibilities
//! - Hold every configured service with its circuit breaker
//! - Match inbound paths to a service (longest prefix wins)
//!
//! # Design Decisions
//! - Built once at gateway startup from static configuration and passed by
//!   reference into request handlers; no module-level singletons
//! - Immutable after construction (thread-safe without locks)
//! - Deterministic matching: entries are ordered by prefix length descending

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::resilience::{BreakerConfig, CircuitBreaker};

/// A configured downstream service and its breaker.
#[derive(Debug)]
pub struct ServiceEntry {
    pub config: ServiceConfig,
    pub breaker: CircuitBreaker,
}

/// Lookup table from path prefix to service, one breaker per service.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    entries: Vec<Arc<ServiceEntry>>,
}

impl ServiceRegistry {
    /// Build the registry from validated configuration.
    pub fn from_config(services: &[ServiceConfig]) -> Self {
        let mut entries: Vec<Arc<ServiceEntry>> = services
            .iter()
            .map(|svc| {
                Arc::new(ServiceEntry {
                    breaker: CircuitBreaker::new(svc.name.clone(), breaker_config(svc)),
                    config: svc.clone(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            b.config
                .path_prefix
                .len()
                .cmp(&a.config.path_prefix.len())
        });
        Self { entries }
    }

    /// Map an inbound path to its service; longest configured prefix wins.
    pub fn match_path(&self, path: &str) -> Option<Arc<ServiceEntry>> {
        self.entries
            .iter()
            .find(|e| path.starts_with(&e.config.path_prefix))
            .cloned()
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<ServiceEntry>> {
        self.entries
            .iter()
            .find(|e| e.config.name == name)
            .cloned()
    }

    pub fn entries(&self) -> &[Arc<ServiceEntry>] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn breaker_config(svc: &ServiceConfig) -> BreakerConfig {
    BreakerConfig {
        timeout: Duration::from_millis(svc.timeout_ms),
        error_threshold_percentage: svc.error_threshold_percentage,
        reset_timeout: Duration::from_millis(svc.reset_timeout_ms),
        rolling_window: Duration::from_millis(svc.rolling_window_ms),
        bucket_count: svc.bucket_count,
        volume_threshold: svc.volume_threshold,
    }
}
