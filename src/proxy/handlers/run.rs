use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use tracing::{debug, error, info};

use crate::proxy::common::errors::{error_response, ProxyErrorKind};
use crate::proxy::errors::network_errors::classify_network_error;
use crate::proxy::server::AppState;
use crate::proxy::stores::BROWSER_SOURCE;
use crate::proxy::upstream::rewriter;

/// `POST /proxy/run` — one synchronous call to the runtime's `/run` endpoint.
/// The full JSON event list comes back at once, so the rewrite is a single
/// pass over the materialized array instead of a live stream transform.
pub async fn run_proxy(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(ProxyErrorKind::BadRequest, &rejection.body_text());
        }
    };

    let app_name = body.get("app_name").and_then(Value::as_str).unwrap_or("?");
    let session_id = body.get("session_id").and_then(Value::as_str).unwrap_or("?");
    info!("Proxying run request for {}/{}", app_name, session_id);

    let url = state.config.upstream_url("/run");

    // Generation can be slow; the long-timeout client covers it.
    let response = match state.stream_client.post(&url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            let info = classify_network_error(&e);
            error!("Error in run proxy: {} ({:?})", e, info.category);
            return error_response(info.kind, &info.detail);
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    let mut events = match response.json::<Value>().await {
        Ok(json) => json,
        Err(e) => {
            error!("Invalid JSON from upstream run endpoint: {}", e);
            return error_response(
                ProxyErrorKind::UpstreamError,
                &format!("Invalid JSON from agent runtime: {}", e),
            );
        }
    };

    if status.is_success() {
        let browser = state.locations.get(BROWSER_SOURCE);
        let rewritten = rewriter::rewrite_event_list(&mut events, browser.as_ref());
        if rewritten > 0 {
            debug!("Rewrote {} function response(s) in run result", rewritten);
        }
    }

    (status, Json(events)).into_response()
}
