//! Techmart storefront library.
//!
//! The HTTP application is built here so that the binary, the CLI and the
//! integration tests share one router and one set of services.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, middleware::from_fn};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::state::AppState;

/// Build the application router with sessions, request ids and tracing.
///
/// Sentry layers are added by the binary, outside this router.
pub fn app(state: AppState) -> Router {
    let session_layer = middleware::create_session_layer(state.pool(), state.config());

    routes::routes()
        .layer(session_layer)
        .layer(from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{DatabaseConfig, Environment, LogFormat, SentryConfig, StorefrontConfig};

    /// Router over a pool that never connects; only routes that reject
    /// before touching the database can be exercised.
    fn test_app() -> Router {
        let config = StorefrontConfig {
            database: DatabaseConfig {
                url: SecretString::from("postgres://techmart@127.0.0.1:1/techmart"),
                max_connections: 1,
                acquire_timeout: Duration::from_millis(200),
            },
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            environment: Environment::Development,
            log_format: LogFormat::Text,
            sentry: SentryConfig::default(),
        };
        let pool = db::create_lazy_pool(&config.database).unwrap();
        app(AppState::new(config, pool))
    }

    async fn send(method: &str, uri: &str) -> axum::response::Response {
        test_app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_ok() {
        let response = send("GET", "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_customer_routes_require_login() {
        for (method, uri) in [
            ("GET", "/cart"),
            ("GET", "/orders"),
            ("GET", "/addresses"),
            ("GET", "/recommendations"),
            ("GET", "/auth/me"),
        ] {
            let response = send(method, uri).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_admin_routes_require_login() {
        for (method, uri) in [
            ("GET", "/admin/orders"),
            ("GET", "/admin/reviews"),
            ("GET", "/admin/variants/1/stock"),
            ("PUT", "/admin/products/1"),
            ("DELETE", "/admin/products/1"),
        ] {
            let response = send(method, uri).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = send("GET", "/no-such-page").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ws_requires_upgrade() {
        let response = send("GET", "/ws").await;
        assert!(response.status().is_client_error());
    }
}
