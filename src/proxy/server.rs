// Router assembly and server entry point.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::proxy::config::GatewayConfig;
use crate::proxy::handlers::{location, run, session, sse};
use crate::proxy::http_client::{build_http_client, HttpClientConfig};
use crate::proxy::middleware::request_logging::request_logging_middleware;
use crate::proxy::stores::{LocationStore, PendingRequestStore};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub pending: Arc<PendingRequestStore>,
    pub locations: Arc<LocationStore>,
    /// Request/response proxying.
    pub client: reqwest::Client,
    /// SSE relays, with a timeout long enough for a full generation.
    pub stream_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&HttpClientConfig::plain(&config))?;
        let stream_client = build_http_client(&HttpClientConfig::streaming(&config))?;
        Ok(Self {
            config: Arc::new(config),
            pending: Arc::new(PendingRequestStore::new()),
            locations: Arc::new(LocationStore::new()),
            client,
            stream_client,
        })
    }
}

/// Build the gateway router over the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/proxy/store_location", post(location::store_location))
        .route(
            "/proxy/session/{app_name}/{user_id}/{session_id}",
            post(session::create_session),
        )
        .route("/proxy/run", post(run::run_proxy))
        .route("/proxy/prepare_sse", post(sse::prepare_sse))
        .route("/proxy/sse_connect/{request_id}", get(sse::sse_connect))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn run(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.host, config.port);
    let upstream = config.upstream_base_url.clone();
    let state = AppState::new(config)?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Gateway listening on {} (upstream {})", addr, upstream);
    axum::serve(listener, router).await?;
    Ok(())
}
