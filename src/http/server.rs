//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a catch-all proxy handler
//! - Wire up middleware (tracing outermost, then capture-and-mask around the timeout)
//! - Forward requests to the configured upstream
//! - Serve until the shutdown signal fires

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    extract::State,
    http::uri::{Authority, Scheme},
    http::{Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{ConfigError, ProxyConfig, ValidationError};
use crate::http::layer::{handle_capture_error, CaptureLayer};
use crate::masking::MaskConfig;
use crate::pipeline::{RecordSink, TracingSink};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server for the masking proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    mask: Arc<MaskConfig>,
}

impl HttpServer {
    /// Create a server logging exchanges through `tracing`.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// Create a server handing exchange records to `sink`.
    pub fn with_sink(config: ProxyConfig, sink: Arc<dyn RecordSink>) -> Result<Self, ConfigError> {
        let mask = Arc::new(config.masking.build()?);
        let upstream = Authority::from_str(&config.upstream.address).map_err(|_| {
            ConfigError::Validation(vec![ValidationError::InvalidAddress {
                field: "upstream.address",
                value: config.upstream.address.clone(),
            }])
        })?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let state = AppState { client, upstream };

        let router = Self::build_router(&config, state, CaptureLayer::new(mask.clone(), sink));
        Ok(Self {
            router,
            config,
            mask,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState, capture: CaptureLayer) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            // Timeout sits inside capture so a timed-out exchange is logged as 408.
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_capture_error))
                    .layer(capture)
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, then drain in-flight exchanges.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.config.upstream.address,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The assembled router, for driving the proxy without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// The masking rules in force.
    pub fn mask_config(&self) -> &MaskConfig {
        &self.mask
    }
}

/// Forward the request to the upstream, unchanged apart from its target.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (mut parts, body) = request.into_parts();

    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(axum::http::uri::PathAndQuery::from_static("/"));
    }
    match Uri::from_parts(uri_parts) {
        Ok(uri) => parts.uri = uri,
        Err(e) => {
            tracing::warn!(uri = %parts.uri, error = %e, "Could not rewrite request URI");
            return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
        }
    }

    tracing::debug!(method = %parts.method, uri = %parts.uri, "Proxying request");

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(upstream = %state.upstream, error = %e, "Upstream error");
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn test_rules_built_from_config() {
        let mut config = ProxyConfig::default();
        config.masking.request.headers = vec!["authorization".into()];
        let server = HttpServer::new(config).unwrap();
        assert!(server.mask_config().request_headers().test("Authorization"));
        assert!(server.mask_config().response_headers().is_never());
    }

    #[test]
    fn test_bad_rule_rejected() {
        let mut config = ProxyConfig::default();
        config.masking.response.header_patterns = vec!["(".into()];
        assert!(matches!(HttpServer::new(config), Err(ConfigError::Masking(_))));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_bad_gateway() {
        let mut config = ProxyConfig::default();
        // reserved port, nothing listens
        config.upstream.address = "127.0.0.1:9".into();
        let router = HttpServer::new(config).unwrap().into_router();

        let res = router
            .oneshot(Request::builder().uri("/x").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }
}
