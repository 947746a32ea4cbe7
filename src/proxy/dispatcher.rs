//! Resilient proxy dispatcher.
//!
//! # Responsibilities
//! - Forward an inbound request to its service's base URL (method, headers,
//!   body preserved; path rewritten)
//! - Run the forward through the service's circuit breaker under its deadline
//! - Retry idempotent requests on transport failure, inside one breaker attempt
//! - Collapse every classified failure into the standard 503 envelope
//!
//! # Design Decisions
//! - Any HTTP status from the downstream (including 4xx/5xx) is a breaker-level
//!   success and is passed through verbatim; the breaker only counts transport
//!   failures and timeouts
//! - Request bodies are buffered (bounded) only when a retry could replay them
//! - Upstream error detail is logged, never sent to the client

use axum::{
    body::{Body, Bytes},
    http::{header, request::Parts, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::time::Instant;

use crate::config::RetryConfig;
use crate::error::UpstreamError;
use crate::observability::metrics;
use crate::proxy::registry::ServiceEntry;
use crate::proxy::rewrite::rewrite_path;
use crate::resilience::{calculate_backoff, max_attempts};

/// Forwards requests to downstream services through their breakers.
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
    retry: RetryConfig,
}

impl Dispatcher {
    pub fn new(retry: RetryConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { client, retry }
    }

    /// Forward `request` to `entry`'s service, or answer with the standard
    /// 503 envelope when the breaker rejects it or the call fails.
    pub async fn dispatch(
        &self,
        entry: &ServiceEntry,
        request: axum::http::Request<Body>,
    ) -> Response {
        let start = Instant::now();
        let service = entry.config.name.as_str();
        let (parts, body) = request.into_parts();

        let target_uri = match self.target_uri(entry, &parts.uri) {
            Ok(uri) => uri,
            Err(err) => {
                tracing::error!(service, error = %err, "failed to build upstream URI");
                metrics::record_proxy_request(service, 503, start);
                return unavailable_response(service);
            }
        };

        // Buffer the body only when a retry could need to replay it.
        let mut single_use_body = None;
        let buffered: Option<Bytes> = if self.retry.enabled
            && crate::resilience::is_idempotent(&parts.method)
        {
            match axum::body::to_bytes(body, self.retry.max_buffered_body_bytes).await {
                Ok(bytes) => Some(bytes),
                Err(err) => {
                    tracing::error!(service, error = %err, "failed to read request body");
                    metrics::record_proxy_request(service, 503, start);
                    return unavailable_response(service);
                }
            }
        } else {
            single_use_body = Some(body);
            None
        };

        let attempts = max_attempts(
            self.retry.enabled,
            entry.config.retries,
            &parts.method,
            buffered.is_some(),
        );

        let result = entry
            .breaker
            .execute(|| {
                self.forward_with_retries(
                    service,
                    &parts,
                    target_uri.clone(),
                    buffered,
                    single_use_body,
                    attempts,
                )
            })
            .await;

        match result {
            Ok(response) => {
                metrics::record_proxy_request(service, response.status().as_u16(), start);
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body)).into_response()
            }
            Err(err) => {
                tracing::warn!(service, error = %err, "request failed, returning fallback");
                metrics::record_proxy_request(service, 503, start);
                unavailable_response(service)
            }
        }
    }

    /// One logical breaker attempt: up to `attempts` transport tries with
    /// jittered backoff in between. The breaker only ever sees the final
    /// outcome, so sub-attempts never inflate its rolling counts.
    async fn forward_with_retries(
        &self,
        service: &str,
        parts: &Parts,
        uri: Uri,
        buffered: Option<Bytes>,
        mut single_use_body: Option<Body>,
        attempts: u32,
    ) -> Result<hyper::Response<hyper::body::Incoming>, UpstreamError> {
        let mut attempt = 0;
        loop {
            attempt += 1;

            let body = match (&buffered, single_use_body.take()) {
                (Some(bytes), _) => Body::from(bytes.clone()),
                (None, Some(body)) => body,
                (None, None) => Body::empty(),
            };

            let mut builder = axum::http::Request::builder()
                .method(parts.method.clone())
                .uri(uri.clone())
                .version(axum::http::Version::HTTP_11);
            if let Some(headers) = builder.headers_mut() {
                for (name, value) in parts.headers.iter() {
                    // Let the client derive Host from the target authority.
                    if name == &header::HOST {
                        continue;
                    }
                    headers.insert(name.clone(), value.clone());
                }
            }
            let request = builder
                .body(body)
                .map_err(|e| UpstreamError::Other(e.to_string()))?;

            match self.client.request(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt < attempts {
                        let delay = calculate_backoff(
                            attempt,
                            self.retry.base_delay_ms,
                            self.retry.max_delay_ms,
                        );
                        tracing::debug!(
                            service,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %err,
                            "transport failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(UpstreamError::Connection(err.to_string()));
                }
            }
        }
    }

    fn target_uri(&self, entry: &ServiceEntry, inbound: &Uri) -> Result<Uri, UpstreamError> {
        let rewritten = rewrite_path(inbound.path(), &entry.config.path_rewrite);
        let path_and_query = match inbound.query() {
            Some(query) => format!("{rewritten}?{query}"),
            None => rewritten,
        };
        let base = entry.config.base_url.trim_end_matches('/');
        format!("{base}{path_and_query}")
            .parse::<Uri>()
            .map_err(|e| UpstreamError::Other(e.to_string()))
    }
}

/// The standard failure envelope: HTTP 503 with a stable JSON shape.
pub fn unavailable_response(service: &str) -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(serde_json::json!({
            "status": "error",
            "message": format!("Service {service} is currently unavailable"),
            "service": service,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RewriteRule, ServiceConfig};
    use crate::proxy::registry::ServiceRegistry;

    fn entry_with_rewrite() -> std::sync::Arc<ServiceEntry> {
        let svc = ServiceConfig {
            name: "vehicle".into(),
            base_url: "http://localhost:3001/".into(),
            path_prefix: "/api/vehicles".into(),
            path_rewrite: vec![RewriteRule {
                from: "/api/vehicles".into(),
                to: "/vehicles".into(),
            }],
            timeout_ms: 5_000,
            retries: 3,
            error_threshold_percentage: 50,
            reset_timeout_ms: 30_000,
            rolling_window_ms: 10_000,
            bucket_count: 10,
            volume_threshold: 10,
        };
        ServiceRegistry::from_config(&[svc]).get("vehicle").unwrap()
    }

    #[test]
    fn test_target_uri_applies_rewrite_and_keeps_query() {
        let dispatcher = Dispatcher::new(RetryConfig::default());
        let entry = entry_with_rewrite();
        let inbound: Uri = "http://gateway/api/vehicles/42?active=true".parse().unwrap();

        let uri = dispatcher.target_uri(&entry, &inbound).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3001/vehicles/42?active=true");
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = unavailable_response("tracking");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["service"], "tracking");
        assert_eq!(json["message"], "Service tracking is currently unavailable");
    }
}
