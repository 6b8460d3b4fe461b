//! Request-level authorization gate
//!
//! Tower middleware that checks the multiplexed credential on every request
//! before the wrapped service sees it. Requests that pass are forwarded
//! untouched, `Authorization` header included, so downstream handlers can
//! still read their connector tokens from it.

use crate::credential::CredentialVerifier;
use axum::body::Body;
use axum::response::{IntoResponse, Response};
use futures::future::BoxFuture;
use http::header::AUTHORIZATION;
use http::Request;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

/// Layer that wraps services in an [`AuthorizationGate`]
#[derive(Clone, Debug)]
pub struct AuthorizationLayer {
    verifier: CredentialVerifier,
}

impl AuthorizationLayer {
    pub fn new(verifier: CredentialVerifier) -> Self {
        Self { verifier }
    }
}

impl<S> Layer<S> for AuthorizationLayer {
    type Service = AuthorizationGate<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthorizationGate {
            inner,
            verifier: self.verifier.clone(),
        }
    }
}

/// Service that rejects requests whose credential does not carry the
/// configured server secret
#[derive(Clone, Debug)]
pub struct AuthorizationGate<S> {
    inner: S,
    verifier: CredentialVerifier,
}

impl<S> Service<Request<Body>> for AuthorizationGate<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.as_bytes());

        if let Err(e) = self.verifier.authorize_bytes(header) {
            debug!(method = %req.method(), uri = %req.uri(), "request refused by gate");
            let response = e.into_response();
            return Box::pin(async move { Ok(response) });
        }

        // The clone that was driven to readiness must be the one that is called.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(inner.call(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::codec::encode;
    use crate::credential::CredentialBundle;
    use axum::routing::get;
    use axum::Router;
    use http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(hits: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/",
                get(move |headers: http::HeaderMap| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        headers
                            .get(AUTHORIZATION)
                            .and_then(|v| v.to_str().ok())
                            .unwrap_or_default()
                            .to_string()
                    }
                }),
            )
            .layer(AuthorizationLayer::new(CredentialVerifier::new("shh")))
    }

    fn request(header: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_header_never_reaches_handler() {
        let hits = Arc::new(AtomicUsize::new(0));
        let response = app(hits.clone()).oneshot(request(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_credential_is_forwarded_unmodified() {
        let hits = Arc::new(AtomicUsize::new(0));
        let header = encode(
            &CredentialBundle::new()
                .with_server_secret("shh")
                .with_connector_token("google", "g-tok"),
        );

        let response = app(hits.clone())
            .oneshot(request(Some(&header)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], header.as_bytes());
    }

    #[tokio::test]
    async fn test_wrong_secret_and_garbage_are_refused() {
        let hits = Arc::new(AtomicUsize::new(0));
        let wrong = encode(&CredentialBundle::new().with_server_secret("wrong"));

        for header in [wrong.as_str(), "garbage!", "e30="] {
            let response = app(hits.clone())
                .oneshot(request(Some(header)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", header);
        }

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
