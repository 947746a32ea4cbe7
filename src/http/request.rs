//! Request identification.
//!
//! # Responsibilities
//! - Ensure every request carries an `x-request-id` before anything else runs
//! - Preserve IDs supplied by the caller for end-to-end correlation
//!
//! # Design Decisions
//! - UUID v4; added as early as possible so logs and forwarded requests agree

use axum::http::{HeaderName, HeaderValue, Request};
use tower::{Layer, Service};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that stamps requests with an `x-request-id` if absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if !request.headers().contains_key(&X_REQUEST_ID) {
            let id = Uuid::new_v4().to_string();
            if let Ok(value) = HeaderValue::from_str(&id) {
                request.headers_mut().insert(X_REQUEST_ID, value);
            }
        }
        self.inner.call(request)
    }
}
