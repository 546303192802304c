use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::Value;
use tracing::{error, info};

use crate::proxy::common::errors::{error_response, ProxyErrorKind};
use crate::proxy::errors::network_errors::classify_network_error;
use crate::proxy::server::AppState;

/// `POST /proxy/session/{app}/{user}/{session}` — forward session creation to
/// the agent runtime, proxying its status and body verbatim.
pub async fn create_session(
    State(state): State<AppState>,
    Path((app_name, user_id, session_id)): Path<(String, String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(ProxyErrorKind::BadRequest, &rejection.body_text());
        }
    };

    info!("Creating session for {}/{}/{}", app_name, user_id, session_id);

    let url = state.config.upstream_url(&format!(
        "/apps/{}/users/{}/sessions/{}",
        app_name, user_id, session_id
    ));

    let response = match state.client.post(&url).json(&body).send().await {
        Ok(r) => r,
        Err(e) => {
            let info = classify_network_error(&e);
            error!("Error in create_session proxy: {} ({:?})", e, info.category);
            return error_response(info.kind, &info.detail);
        }
    };

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);

    match response.json::<Value>().await {
        Ok(json) => (status, Json(json)).into_response(),
        Err(e) => {
            error!("Invalid JSON from upstream session endpoint: {}", e);
            error_response(
                ProxyErrorKind::UpstreamError,
                &format!("Invalid JSON from agent runtime: {}", e),
            )
        }
    }
}
