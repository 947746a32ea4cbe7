//! End-to-end resilience tests for the gateway.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fleet_gateway::config::{
    GatewayConfig, HealthCheckConfig, RewriteRule, ServiceConfig,
};
use fleet_gateway::lifecycle::Shutdown;
use fleet_gateway::GatewayServer;

mod common;

fn service_config(name: &str, prefix: &str, backend: SocketAddr) -> ServiceConfig {
    ServiceConfig {
        name: name.into(),
        base_url: format!("http://{backend}"),
        path_prefix: prefix.into(),
        path_rewrite: Vec::new(),
        timeout_ms: 1_000,
        retries: 1,
        error_threshold_percentage: 50,
        reset_timeout_ms: 30_000,
        rolling_window_ms: 10_000,
        bucket_count: 10,
        volume_threshold: 10,
    }
}

fn gateway_config(proxy_addr: SocketAddr, services: Vec<ServiceConfig>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = proxy_addr.to_string();
    config.services = services;
    config.health_check.enabled = false;
    config.retries.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

async fn start_gateway(config: GatewayConfig, proxy_addr: SocketAddr) -> Shutdown {
    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    let listener = tokio::net::TcpListener::bind(proxy_addr).await.unwrap();
    let server_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

async fn breaker_state(client: &reqwest::Client, proxy: SocketAddr, service: &str) -> String {
    let status: serde_json::Value = client
        .get(format!("http://{proxy}/gateway/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    status["services"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == service)
        .unwrap()["breaker"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_breaker_opens_and_short_circuits() {
    let backend_addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28482".parse().unwrap();

    let accepts = common::start_resetting_backend(backend_addr).await;
    let config = gateway_config(
        proxy_addr,
        vec![service_config("vehicle", "/api/vehicles", backend_addr)],
    );
    let shutdown = start_gateway(config, proxy_addr).await;
    let client = client();

    // Ten transport failures fill the window; ratio 100% >= 50%.
    for _ in 0..10 {
        let res = client
            .get(format!("http://{proxy_addr}/api/vehicles"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 503);
    }
    assert_eq!(
        breaker_state(&client, proxy_addr, "vehicle").await,
        "open"
    );

    // Further calls are short-circuited without reaching the backend.
    let attempts_before = accepts.load(Ordering::SeqCst);
    let res = client
        .get(format!("http://{proxy_addr}/api/vehicles"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 503);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["status"], "error");
    assert_eq!(body["service"], "vehicle");
    assert_eq!(
        body["message"],
        "Service vehicle is currently unavailable"
    );
    assert_eq!(accepts.load(Ordering::SeqCst), attempts_before);

    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_statuses_pass_through() {
    let backend_addr: SocketAddr = "127.0.0.1:28483".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28484".parse().unwrap();

    common::start_mock_service(backend_addr, |_| async { (500, "boom".into()) }).await;
    let config = gateway_config(
        proxy_addr,
        vec![service_config("maintenance", "/api/maintenance", backend_addr)],
    );
    let shutdown = start_gateway(config, proxy_addr).await;
    let client = client();

    // A 5xx is the downstream's answer, not a breaker failure.
    for _ in 0..12 {
        let res = client
            .get(format!("http://{proxy_addr}/api/maintenance/jobs"))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 500);
        assert_eq!(res.text().await.unwrap(), "boom");
    }
    assert_eq!(
        breaker_state(&client, proxy_addr, "maintenance").await,
        "closed"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn test_path_rewrite_is_applied() {
    let backend_addr: SocketAddr = "127.0.0.1:28485".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28486".parse().unwrap();

    common::start_mock_service(backend_addr, |path| async move { (200, path) }).await;
    let mut svc = service_config("vehicle", "/api/vehicles", backend_addr);
    svc.path_rewrite = vec![RewriteRule {
        from: "/api/vehicles".into(),
        to: "/vehicles".into(),
    }];
    let config = gateway_config(proxy_addr, vec![svc]);
    let shutdown = start_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/api/vehicles/42/location"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/vehicles/42/location");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let proxy_addr: SocketAddr = "127.0.0.1:28487".parse().unwrap();
    let backend_addr: SocketAddr = "127.0.0.1:28488".parse().unwrap();

    let config = gateway_config(
        proxy_addr,
        vec![service_config("vehicle", "/api/vehicles", backend_addr)],
    );
    let shutdown = start_gateway(config, proxy_addr).await;

    let res = client()
        .get(format!("http://{proxy_addr}/api/unknown"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_health_monitor_tracks_transitions() {
    let backend_addr: SocketAddr = "127.0.0.1:28489".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28490".parse().unwrap();

    let healthy = Arc::new(AtomicBool::new(true));
    let flag = healthy.clone();
    common::start_mock_service(backend_addr, move |path| {
        let flag = flag.clone();
        async move {
            if path == "/health" {
                if flag.load(Ordering::SeqCst) {
                    (200, "ok".into())
                } else {
                    (503, "down".into())
                }
            } else {
                (200, "data".into())
            }
        }
    })
    .await;

    let mut config = gateway_config(
        proxy_addr,
        vec![service_config("tracking", "/api/tracking", backend_addr)],
    );
    config.health_check = HealthCheckConfig {
        enabled: true,
        interval_ms: 200,
        timeout_ms: 500,
        path: "/health".into(),
    };
    let shutdown = start_gateway(config, proxy_addr).await;
    let client = client();

    let health_of = |client: &reqwest::Client| {
        let client = client.clone();
        async move {
            let status: serde_json::Value = client
                .get(format!("http://{proxy_addr}/gateway/status"))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            status["services"][0]["healthy"].as_bool()
        }
    };

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(health_of(&client).await, Some(true));

    healthy.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(health_of(&client).await, Some(false));

    healthy.store(true, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(health_of(&client).await, Some(true));

    shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_reaches_the_backend() {
    let backend_addr: SocketAddr = "127.0.0.1:28491".parse().unwrap();
    let proxy_addr: SocketAddr = "127.0.0.1:28492".parse().unwrap();

    let captured = common::start_header_capture_backend(backend_addr, "x-request-id").await;
    let config = gateway_config(
        proxy_addr,
        vec![service_config("analytics", "/api/analytics", backend_addr)],
    );
    let shutdown = start_gateway(config, proxy_addr).await;

    // Caller-supplied IDs are forwarded unchanged.
    let res = client()
        .get(format!("http://{proxy_addr}/api/analytics/usage"))
        .header("x-request-id", "fleet-test-7")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(
        captured.lock().unwrap().as_deref(),
        Some("fleet-test-7")
    );

    // Requests without an ID get one stamped before forwarding.
    let res = client()
        .get(format!("http://{proxy_addr}/api/analytics/usage"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let generated = captured.lock().unwrap().clone().unwrap();
    assert!(uuid::Uuid::parse_str(&generated).is_ok());

    shutdown.trigger();
}
