//! HTTP server setup and the proxy handler.
//!
//! # Responsibilities
//! - Create the Axum Router with a catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Resolve the absolute target, forward, relay the origin response
//! - Serve until the shutdown signal, then drain

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::headers::strip_hop_by_hop;
use crate::http::request::{ProxyTarget, RequestIdExt, RequestIdLayer};
use crate::http::response::{relay, ProxyError};
use crate::lifecycle::shutdown;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: Client<HttpConnector, Body>,
    pub config: Arc<ProxyConfig>,
}

/// HTTP server for the forward proxy.
pub struct HttpServer {
    router: Router,
    config: Arc<ProxyConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let config = Arc::new(config);

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(config.timeouts.connect_secs.map(Duration::from_secs));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let state = AppState {
            client,
            config: config.clone(),
        };

        let router = Self::build_router(state);
        Self { router, config }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .request_id()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
                tracing::info_span!(
                    "proxy",
                    request_id = %request_id,
                    method = %request.method(),
                    target = %request.uri(),
                )
            }))
            .layer(RequestIdLayer)
    }

    /// The fully layered router, for driving the proxy without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            strip_hop_by_hop = self.config.forwarding.strip_hop_by_hop,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every inbound request is a proxy request.
async fn proxy_handler(State(state): State<AppState>, request: Request) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();

    match forward(&state, request).await {
        Ok(response) => {
            metrics::record_request(method.as_str(), response.status().as_u16(), start_time);
            response
        }
        Err(e) => {
            match &e {
                ProxyError::InvalidTarget(cause) => {
                    tracing::warn!(error = %cause, "Rejecting request target");
                }
                ProxyError::BuildRequest(cause) => {
                    tracing::error!(error = %cause, "Could not create outbound request");
                }
                ProxyError::Upstream(cause) => {
                    tracing::error!(error = %cause, detail = ?cause, "Could not reach the origin");
                }
            }
            metrics::record_error(e.kind());
            metrics::record_request(method.as_str(), e.status().as_u16(), start_time);
            e.into_response()
        }
    }
}

/// Mirror `request` to the origin named in its request line.
async fn forward(state: &AppState, request: Request) -> Result<Response, ProxyError> {
    let target = ProxyTarget::from_request(request.method(), request.uri())?;
    let strip = state.config.forwarding.strip_hop_by_hop;

    let (parts, body) = request.into_parts();
    let mut headers = parts.headers;
    if strip {
        strip_hop_by_hop(&mut headers);
    }

    tracing::debug!(origin = %target.host(), "Proxying request");

    let mut builder = axum::http::Request::builder()
        .method(parts.method)
        .uri(target.into_uri());
    if let Some(outbound_headers) = builder.headers_mut() {
        outbound_headers.extend(headers);
    }
    let outbound = builder.body(body)?;

    let response = state.client.request(outbound).await?;

    tracing::info!(status = %response.status(), "Proxying response");

    Ok(relay(response, strip))
}
