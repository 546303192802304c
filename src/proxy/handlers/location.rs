use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::proxy::common::errors::{error_response, ProxyErrorKind};
use crate::proxy::server::AppState;
use crate::proxy::stores::BROWSER_SOURCE;

/// `POST /proxy/store_location` — store the browser's geolocation report.
pub async fn store_location(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(ProxyErrorKind::BadRequest, &rejection.body_text());
        }
    };

    match state.locations.put_json(BROWSER_SOURCE, &body) {
        Ok(record) => {
            info!("Stored browser location: {:.4}, {:.4}", record.lat, record.lng);
            Json(json!({"status": "success"})).into_response()
        }
        Err(e) => {
            error!("Error storing location: {}", e);
            error_response(ProxyErrorKind::InvalidLocation, &e.to_string())
        }
    }
}
