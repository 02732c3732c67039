//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (tracing, request ID, CORS)
//! - Bind the server to a listener and serve until shutdown
//! - Dispatch requests through the routing table
//! - Forward requests to the decided upstream, streaming both bodies
//! - Hand WebSocket upgrades to the relay

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, Uri, Version},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::validation::{validate_config, ValidationError};
use crate::config::GatewayConfig;
use crate::http::middleware::cors::{cors_middleware, CorsPolicy};
use crate::http::request::{self, RequestIdExt, RequestIdLayer, X_REQUEST_ID};
use crate::http::response::{proxy_error_response, relay_body, ProxyErrorBody};
use crate::http::websocket;
use crate::routing::{RouteDecision, Router as GatewayRouter};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<GatewayRouter>,
    pub cors: Arc<CorsPolicy>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the gateway.
#[derive(Debug)]
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Compile the routing table and CORS policy and assemble the server.
    /// The config goes through the same validation the file loader applies,
    /// so a config built in code cannot skip those checks.
    pub fn new(config: GatewayConfig) -> Result<Self, Vec<ValidationError>> {
        validate_config(&config)?;
        let gateway_router = Arc::new(GatewayRouter::from_config(&config)?);
        let cors = Arc::new(CorsPolicy::from_config(&config.cors).map_err(|e| vec![e])?);

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            router: gateway_router,
            cors,
            client,
        };

        let router = Self::build_router(state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
            .with_state(state)
            .layer(RequestIdLayer)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown requested, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Main proxy handler. Routes the path, then either relays a WebSocket
/// upgrade or forwards the request over HTTP.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request.request_id().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let method = request.method().clone();

    let decision = state.router.decide(&path, query.as_deref());

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        rule = %decision.rule,
        upstream = %decision.upstream,
        target = %decision.target,
        "routing request"
    );

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if decision.websocket && request::is_websocket_upgrade(request.headers()) {
        return websocket::proxy_upgrade(request, decision, request_id, peer).await;
    }

    forward(&state, request, decision, request_id, peer).await
}

/// Forward one HTTP request to the decided upstream.
async fn forward(
    state: &AppState,
    request: Request<Body>,
    decision: RouteDecision,
    request_id: String,
    peer: String,
) -> Response {
    let path = request.uri().path().to_string();
    let original_url = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    let uri: Uri = match decision.target.parse() {
        Ok(uri) => uri,
        Err(e) => {
            // Bases are parsed at startup, so this indicates a path the
            // upstream could never address anyway.
            tracing::error!(
                request_id = %request_id,
                target = %decision.target,
                error = %e,
                "composed target is not a valid URI"
            );
            return proxy_error_response(&ProxyErrorBody::new(
                e.to_string(),
                original_url,
                path,
            ));
        }
    };
    let authority = uri.authority().cloned();

    let (mut parts, body) = request.into_parts();
    request::strip_hop_by_hop(&mut parts.headers);

    // The upstream virtual-hosts on its own name, not the gateway's.
    if let Some(authority) = &authority {
        if let Ok(host) = HeaderValue::from_str(authority.as_str()) {
            parts.headers.insert(header::HOST, host);
        }
    }
    request::append_forwarded_for(&mut parts.headers, &peer);
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        parts.headers.insert(X_REQUEST_ID, value);
    }

    parts.uri = uri;
    // Upstreams speak plain HTTP/1.1; an inbound h2 version must not leak
    // into the client connection.
    parts.version = Version::HTTP_11;

    let upstream_request = Request::from_parts(parts, body);

    match state.client.request(upstream_request).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                request_id = %request_id,
                status = %status,
                upstream = %decision.upstream,
                "upstream responded"
            );

            let (mut parts, body) = response.into_parts();
            request::strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, relay_body(body, request_id))
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                rule = %decision.rule,
                target = %decision.target,
                error = %e,
                "upstream request failed"
            );
            proxy_error_response(&ProxyErrorBody::new(e.to_string(), original_url, path))
        }
    }
}
