//! Advisory per-service health state.
//!
//! # Design Decisions
//! - Optimistic start: every service begins healthy until a probe says otherwise
//! - Transitions are computed by a pure update so flapping detection is testable
//! - Never consulted by the circuit breaker; this is an observability signal

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

/// Direction of a health flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    BecameHealthy,
    BecameUnhealthy,
}

/// Latest advisory health for one service.
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub service: String,
    pub healthy: bool,
    pub last_checked_at: Option<SystemTime>,
}

impl ServiceHealthStatus {
    pub fn optimistic(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            healthy: true,
            last_checked_at: None,
        }
    }

    /// Apply a probe result; returns the transition when `healthy` flipped.
    pub fn record(&mut self, healthy: bool, at: SystemTime) -> Option<HealthTransition> {
        let flipped = self.healthy != healthy;
        self.healthy = healthy;
        self.last_checked_at = Some(at);
        if !flipped {
            return None;
        }
        Some(if healthy {
            HealthTransition::BecameHealthy
        } else {
            HealthTransition::BecameUnhealthy
        })
    }
}

/// Shared, read-mostly map of service health. Writers are serialized because
/// only one monitor tick runs at a time.
#[derive(Debug, Clone, Default)]
pub struct HealthBoard {
    inner: Arc<RwLock<HashMap<String, ServiceHealthStatus>>>,
}

impl HealthBoard {
    pub fn new<'a>(services: impl IntoIterator<Item = &'a str>) -> Self {
        let map = services
            .into_iter()
            .map(|name| (name.to_string(), ServiceHealthStatus::optimistic(name)))
            .collect();
        Self {
            inner: Arc::new(RwLock::new(map)),
        }
    }

    /// Record a probe result for `service`, returning any transition.
    pub fn record(
        &self,
        service: &str,
        healthy: bool,
        at: SystemTime,
    ) -> Option<HealthTransition> {
        let mut map = self.inner.write().unwrap();
        map.get_mut(service)?.record(healthy, at)
    }

    pub fn is_healthy(&self, service: &str) -> Option<bool> {
        self.inner.read().unwrap().get(service).map(|s| s.healthy)
    }

    /// Point-in-time copy of every status, sorted by service name.
    pub fn snapshot(&self) -> Vec<ServiceHealthStatus> {
        let mut statuses: Vec<_> = self.inner.read().unwrap().values().cloned().collect();
        statuses.sort_by(|a, b| a.service.cmp(&b.service));
        statuses
    }
}
