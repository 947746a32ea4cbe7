//! Active health monitoring.
//!
//! # Responsibilities
//! - Periodically probe every configured service's health endpoint
//! - Update the shared health board and log transitions
//!
//! # Design Decisions
//! - Probes within a tick run concurrently; ticks never overlap (a tick that
//!   would start while the previous one is still running is skipped)
//! - Every probe carries a deadline; timeouts and non-200 answers are unhealthy
//! - The monitor is an explicit cancellable task: `start()` returns a handle,
//!   `stop()` signals it and awaits the in-flight tick, so no work leaks past
//!   gateway shutdown

use std::time::{Duration, SystemTime};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{HealthCheckConfig, ServiceConfig};
use crate::health::status::{HealthBoard, HealthTransition};
use crate::observability::metrics;

/// One probed endpoint.
#[derive(Debug, Clone)]
struct HealthTarget {
    service: String,
    url: String,
}

/// Periodic prober of downstream health endpoints.
pub struct HealthMonitor {
    targets: Vec<HealthTarget>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
    board: HealthBoard,
}

/// Handle to a running monitor; dropping it does not stop the task, call
/// [`HealthMonitorHandle::stop`].
pub struct HealthMonitorHandle {
    board: HealthBoard,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HealthMonitorHandle {
    pub fn board(&self) -> HealthBoard {
        self.board.clone()
    }

    /// Cancel the timer loop and wait for any in-flight tick to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
        tracing::info!("health monitor stopped");
    }
}

impl HealthMonitor {
    pub fn new(services: &[ServiceConfig], config: HealthCheckConfig) -> Self {
        let targets = services
            .iter()
            .map(|svc| HealthTarget {
                service: svc.name.clone(),
                url: format!("{}{}", svc.base_url.trim_end_matches('/'), config.path),
            })
            .collect();
        let board = HealthBoard::new(services.iter().map(|svc| svc.name.as_str()));
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            targets,
            config,
            client,
            board,
        }
    }

    pub fn board(&self) -> HealthBoard {
        self.board.clone()
    }

    /// Spawn the timer loop and return its handle.
    pub fn start(self) -> HealthMonitorHandle {
        let board = self.board.clone();
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        tracing::info!(
            interval_ms = self.config.interval_ms,
            path = %self.config.path,
            services = self.targets.len(),
            "health monitor starting"
        );

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(self.config.interval_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.check_all().await;
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("health monitor received shutdown signal");
                        break;
                    }
                }
            }
        });

        HealthMonitorHandle {
            board,
            shutdown,
            task,
        }
    }

    /// One tick: probe every target concurrently, then record the results.
    async fn check_all(&self) {
        let results = join_all(self.targets.iter().map(|t| self.probe(t))).await;
        let checked_at = SystemTime::now();

        for (target, healthy) in self.targets.iter().zip(results) {
            metrics::record_service_health(&target.service, healthy);
            match self.board.record(&target.service, healthy, checked_at) {
                Some(HealthTransition::BecameUnhealthy) => {
                    tracing::warn!(service = %target.service, "service became unhealthy");
                }
                Some(HealthTransition::BecameHealthy) => {
                    tracing::info!(service = %target.service, "service recovered");
                }
                None => {}
            }
        }
    }

    /// A service is healthy only on a 200 answer within the deadline.
    async fn probe(&self, target: &HealthTarget) -> bool {
        let request = match Request::builder()
            .method("GET")
            .uri(target.url.as_str())
            .header("user-agent", "fleet-gateway-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(err) => {
                tracing::error!(service = %target.service, error = %err, "failed to build health probe");
                return false;
            }
        };

        let deadline = Duration::from_millis(self.config.timeout_ms);
        match time::timeout(deadline, self.client.request(request)).await {
            Ok(Ok(response)) => response.status() == StatusCode::OK,
            Ok(Err(err)) => {
                tracing::debug!(service = %target.service, error = %err, "health probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(service = %target.service, "health probe timed out");
                false
            }
        }
    }
}
