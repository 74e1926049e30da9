//! Server instance management.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::from_fn_with_state;
use thiserror::Error;
use tokio::signal;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::handlers::{AppState, create_router};
use crate::pipeline::Pipeline;
use crate::rate_limit::{RateLimiter, enforce_rate_limit};

/// Largest accepted request body, 10 MiB.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Hardening headers added to every response that does not already set them.
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    (
        "content-security-policy",
        "default-src 'self';base-uri 'self';font-src 'self' https: data:;form-action 'self';\
         frame-ancestors 'self';img-src 'self' data:;object-src 'none';script-src 'self';\
         script-src-attr 'none';style-src 'self' https: 'unsafe-inline';upgrade-insecure-requests",
    ),
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server wrapping one shared [`Pipeline`].
pub struct ContractLensServer {
    config: ServerConfig,
    state: AppState,
    limiter: Arc<RateLimiter>,
}

impl ContractLensServer {
    pub fn new(config: ServerConfig, pipeline: Arc<Pipeline>) -> Result<Self, ServerError> {
        config.validate().map_err(ServerError::Config)?;
        let state = AppState::new(pipeline, config.clone());
        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window(),
            config.rate_limit_max_requests,
        ));
        Ok(Self {
            config,
            state,
            limiter,
        })
    }

    /// Full application: routes, body limit, rate limiting, security headers, CORS and tracing.
    ///
    /// Every router built from one server shares the same rate-limit counters.
    pub fn router(&self) -> Router {
        let mut router = create_router()
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .layer(from_fn_with_state(self.limiter.clone(), enforce_rate_limit));
        for &(name, value) in SECURITY_HEADERS {
            router = router.layer(SetResponseHeaderLayer::if_not_present(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ));
        }
        router
            .layer(cors_layer(&self.config.cors_origins))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Serve until Ctrl+C or SIGTERM, then drain in-flight requests.
    pub async fn start(&self) -> Result<(), ServerError> {
        let addr = self.config.socket_addr().map_err(ServerError::Config)?;
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        info!(
            url = %self.config.server_url(),
            environment = %self.config.environment,
            rate_limit = self.config.rate_limit_max_requests,
            rate_limit_window_ms = self.config.rate_limit_window_ms,
            "server listening"
        );

        let app = self.router().into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown())
            .await?;
        info!("server stopped");
        Ok(())
    }

    pub fn server_url(&self) -> String {
        self.config.server_url()
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("received shutdown signal"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix;
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("received TERM signal");
            }
            Err(e) => {
                error!(error = %e, "failed to install TERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use contractlens_ai::AnalysisEngine;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::pipeline::tests::{FakeContracts, FakeGenerator, FakeParts, model_reply};

    fn pipeline() -> Arc<Pipeline> {
        Arc::new(Pipeline::new(
            Arc::new(FakeParts::acme()),
            Arc::new(FakeContracts::with_docs(1)),
            AnalysisEngine::new(Arc::new(FakeGenerator::replying(model_reply()))),
        ))
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert!(matches!(
            ContractLensServer::new(config, pipeline()),
            Err(ServerError::Config(_))
        ));
    }

    #[tokio::test]
    async fn cors_allows_configured_origin() {
        let server = ContractLensServer::new(ServerConfig::default(), pipeline()).unwrap();
        let req = Request::builder()
            .uri("/api/contracts/formats")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn cors_omits_unknown_origin() {
        let server = ContractLensServer::new(ServerConfig::default(), pipeline()).unwrap();
        let req = Request::builder()
            .uri("/api/contracts/formats")
            .header("origin", "https://evil.example")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    fn limited_server(max: u32) -> ContractLensServer {
        let config = ServerConfig {
            rate_limit_window_ms: 60_000,
            rate_limit_max_requests: max,
            ..Default::default()
        };
        ContractLensServer::new(config, pipeline()).unwrap()
    }

    fn formats_from(ip: [u8; 4]) -> Request<Body> {
        let mut req = Request::builder()
            .uri("/api/contracts/formats")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from((ip, 40_000))));
        req
    }

    #[tokio::test]
    async fn requests_over_the_limit_get_429() {
        let server = limited_server(3);
        for remaining in ["2", "1", "0"] {
            let resp = server.router().oneshot(formats_from([10, 0, 0, 1])).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(resp.headers()["ratelimit-limit"], "3");
            assert_eq!(resp.headers()["ratelimit-remaining"], remaining);
        }

        let resp = server.router().oneshot(formats_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(resp.headers().contains_key(header::RETRY_AFTER));
        assert_eq!(resp.headers()["x-content-type-options"], "nosniff");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], crate::rate_limit::RATE_LIMITED_MESSAGE);
        assert_eq!(body["retryAfter"], 60);
    }

    #[tokio::test]
    async fn limit_is_per_client_ip() {
        let server = limited_server(1);
        let first = server.router().oneshot(formats_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let again = server.router().oneshot(formats_from([10, 0, 0, 1])).await.unwrap();
        assert_eq!(again.status(), StatusCode::TOO_MANY_REQUESTS);
        let other = server.router().oneshot(formats_from([10, 0, 0, 2])).await.unwrap();
        assert_eq!(other.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn default_limit_allows_a_hundred_per_window() {
        let server = ContractLensServer::new(ServerConfig::default(), pipeline()).unwrap();
        for _ in 0..100 {
            let resp = server.router().oneshot(formats_from([127, 0, 0, 1])).await.unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let resp = server.router().oneshot(formats_from([127, 0, 0, 1])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn responses_carry_security_headers() {
        let server = ContractLensServer::new(ServerConfig::default(), pipeline()).unwrap();
        let resp = server.router().oneshot(formats_from([127, 0, 0, 1])).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        for &(name, value) in SECURITY_HEADERS {
            assert_eq!(resp.headers()[name], value, "{name}");
        }

        let req = Request::builder().uri("/nowhere").body(Body::empty()).unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()["x-frame-options"], "SAMEORIGIN");
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = ContractLensServer::new(ServerConfig::default(), pipeline()).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/api/contracts/analyze")
            .header("content-type", "application/json")
            .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
