//! HTTP server setup and request handling.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway handler and status endpoint
//! - Wire up middleware (tracing, request ID, outer timeout)
//! - Spawn and later stop the health monitor
//! - Forward breaker events into metrics
//!
//! # Design Decisions
//! - The registry and dispatcher are built once here and shared via state;
//!   nothing breaker-related lives in module globals
//! - Unmatched paths get an explicit 404, never a default service

use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::GatewayConfig;
use crate::health::{HealthBoard, HealthMonitor};
use crate::http::request::RequestIdLayer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::proxy::{Dispatcher, ServiceRegistry};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub dispatcher: Arc<Dispatcher>,
    pub health: HealthBoard,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    config: GatewayConfig,
    registry: Arc<ServiceRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl GatewayServer {
    /// Build the registry and dispatcher from validated configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::from_config(&config.services));
        let dispatcher = Arc::new(Dispatcher::new(config.retries.clone()));
        Self {
            config,
            registry,
            dispatcher,
        }
    }

    /// Run the server until `shutdown` fires, then stop the health monitor.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            services = self.registry.entries().len(),
            "gateway starting"
        );

        let monitor_handle = if self.config.health_check.enabled {
            let monitor =
                HealthMonitor::new(&self.config.services, self.config.health_check.clone());
            Some(monitor.start())
        } else {
            None
        };
        let health = monitor_handle
            .as_ref()
            .map(|h| h.board())
            .unwrap_or_else(|| {
                HealthBoard::new(self.config.services.iter().map(|s| s.name.as_str()))
            });

        self.spawn_event_forwarders(&shutdown);

        let state = AppState {
            registry: self.registry.clone(),
            dispatcher: self.dispatcher.clone(),
            health,
        };
        let app = Router::new()
            .route("/gateway/status", get(status_handler))
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.listener.request_timeout_secs,
            )))
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http());

        let mut shutdown_rx = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        if let Some(handle) = monitor_handle {
            handle.stop().await;
        }
        tracing::info!("gateway stopped");
        Ok(())
    }

    /// One task per service draining breaker events into metrics.
    fn spawn_event_forwarders(&self, shutdown: &Shutdown) {
        for entry in self.registry.entries() {
            let mut events = entry.breaker.subscribe();
            let mut shutdown_rx = shutdown.subscribe();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Ok(event) => metrics::record_breaker_transition(
                                &event.service,
                                &event.kind.to_string(),
                            ),
                            Err(RecvError::Lagged(_)) => continue,
                            Err(RecvError::Closed) => break,
                        },
                        _ = shutdown_rx.recv() => break,
                    }
                }
            });
        }
    }
}

/// Main gateway handler: map the path to a service, dispatch through its breaker.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = request.uri().path().to_string();

    match state.registry.match_path(&path) {
        Some(entry) => state.dispatcher.dispatch(&entry, request).await,
        None => {
            tracing::debug!(path = %path, "no configured service matches");
            (StatusCode::NOT_FOUND, "No configured service matches this path").into_response()
        }
    }
}

/// Operational snapshot: breaker state, rolling counts, and advisory health.
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let health: std::collections::HashMap<String, _> = state
        .health
        .snapshot()
        .into_iter()
        .map(|status| (status.service.clone(), status))
        .collect();

    let services: Vec<_> = state
        .registry
        .entries()
        .iter()
        .map(|entry| {
            let name = entry.config.name.as_str();
            let window = entry.breaker.window_snapshot();
            let status = health.get(name);
            serde_json::json!({
                "name": name,
                "breaker": entry.breaker.state().to_string(),
                "window": {
                    "successes": window.successes,
                    "failures": window.failures,
                },
                "healthy": status.map(|s| s.healthy),
                "last_checked_at_ms": status
                    .and_then(|s| s.last_checked_at)
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_millis() as u64),
            })
        })
        .collect();

    Json(serde_json::json!({ "services": services }))
}
