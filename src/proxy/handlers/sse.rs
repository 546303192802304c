// SSE orchestration: a POST registers the run request and hands back an
// opaque id, then a GET opens the stream. The gateway relays the upstream
// `/run_sse` stream frame by frame, rewriting intercepted function responses
// on the way through.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::proxy::common::errors::{error_response, ProxyErrorKind};
use crate::proxy::errors::network_errors::classify_network_error;
use crate::proxy::middleware::request_logging::new_trace_id;
use crate::proxy::server::AppState;
use crate::proxy::stores::{LocationStore, PendingRequestStore, RequestStatus, BROWSER_SOURCE};
use crate::proxy::upstream::codec::{self, SseDecoder, StreamEvent};
use crate::proxy::upstream::correlator::CallCorrelator;
use crate::proxy::upstream::rewriter;

/// `POST /proxy/prepare_sse` — register a run request for later streaming.
/// The stored payload always runs in streaming mode, whatever the client set.
pub async fn prepare_sse(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(mut payload) = match body {
        Ok(b) => b,
        Err(rejection) => {
            return error_response(ProxyErrorKind::BadRequest, &rejection.body_text());
        }
    };

    let Some(fields) = payload.as_object_mut() else {
        return error_response(ProxyErrorKind::BadRequest, "Request body must be a JSON object");
    };
    fields.insert("streaming".to_string(), json!(true));

    let app_name = payload
        .get("app_name")
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();
    let session_id = payload
        .get("session_id")
        .and_then(Value::as_str)
        .unwrap_or("?")
        .to_string();

    let request_id = state.pending.register(payload);
    info!(
        "Prepared SSE request {} for {}/{}",
        request_id, app_name, session_id
    );

    Json(json!({ "request_id": request_id })).into_response()
}

/// Log the user's message text from the stored run payload.
fn log_user_message(trace_id: &str, payload: &Value) {
    let Some(message) = payload.get("new_message") else {
        return;
    };
    if message.get("role").and_then(Value::as_str) != Some("user") {
        return;
    }
    let Some(parts) = message.get("parts").and_then(Value::as_array) else {
        return;
    };
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            info!("[{}] User message: {}", trace_id, text);
        }
    }
}

/// Log assistant text parts flowing through the stream.
fn log_assistant_text(trace_id: &str, payload: &Value) {
    let Some(parts) = payload
        .get("content")
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
    else {
        return;
    };
    for part in parts {
        if let Some(text) = part.get("text").and_then(Value::as_str) {
            debug!("[{}] Assistant output: {}", trace_id, text);
        }
    }
}

/// Records a claimed request's final status and schedules its eviction.
///
/// Lives inside the relay generator: when the client disconnects mid-stream
/// the generator is dropped without reaching a terminal state, and the Drop
/// impl still marks the entry and starts the eviction timer. Terminal paths
/// call [`StreamCleanup::finish`] with the actual outcome instead.
struct StreamCleanup {
    pending: Arc<PendingRequestStore>,
    request_id: String,
    delay: Duration,
    status: RequestStatus,
}

impl StreamCleanup {
    fn new(pending: Arc<PendingRequestStore>, request_id: String, delay: Duration) -> Self {
        Self {
            pending,
            request_id,
            delay,
            status: RequestStatus::Error,
        }
    }

    fn finish(mut self, status: RequestStatus) {
        self.status = status;
    }
}

impl Drop for StreamCleanup {
    fn drop(&mut self) {
        self.pending.set_status(&self.request_id, self.status);
        self.pending.evict_after(&self.request_id, self.delay);
    }
}

/// Run one decoded frame through the rewrite pipeline and serialize it back
/// onto the wire. Untouched frames are relayed from their original bytes.
fn relay_event(
    event: &mut StreamEvent,
    correlator: &mut CallCorrelator,
    locations: &LocationStore,
    trace_id: &str,
) -> String {
    if let Some(payload) = event.parsed.as_mut() {
        log_assistant_text(trace_id, payload);
        // Read at rewrite time so a report landing mid-stream is used.
        let browser = locations.get(BROWSER_SOURCE);
        if rewriter::rewrite_event(payload, correlator, browser.as_ref()) {
            return codec::encode_payload(payload);
        }
    }
    codec::encode_raw(&event.raw)
}

/// `GET /proxy/sse_connect/{request_id}` — open the stream for a prepared
/// request. Each id can be connected exactly once; unknown, already claimed,
/// and evicted ids all look the same from outside.
pub async fn sse_connect(State(state): State<AppState>, Path(request_id): Path<String>) -> Response {
    let Some(payload) = state.pending.claim(&request_id) else {
        return error_response(ProxyErrorKind::NotFound, "Request not found");
    };

    let trace_id = new_trace_id();
    info!("[{}] SSE connect for request {}", trace_id, request_id);
    log_user_message(&trace_id, &payload);

    let url = state.config.upstream_url("/run_sse");
    let eviction_delay = Duration::from_secs(state.config.eviction_delay_secs);
    let pending = state.pending.clone();
    let locations = state.locations.clone();
    let stream_client = state.stream_client.clone();

    let sse_stream = async_stream::stream! {
        let cleanup = StreamCleanup::new(pending, request_id.clone(), eviction_delay);
        let send_result = stream_client.post(&url).json(&payload).send().await;

        let response = match send_result {
            Ok(r) => r,
            Err(e) => {
                let net_error = classify_network_error(&e);
                error!(
                    "[{}] Error in SSE streaming for {}: {} ({:?})",
                    trace_id, request_id, e, net_error.category
                );
                yield Ok::<Bytes, std::io::Error>(Bytes::from(codec::encode_payload(
                    &json!({"error": net_error.detail}),
                )));
                cleanup.finish(RequestStatus::Error);
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(
                "[{}] Error response from upstream ({}): {}",
                trace_id, status, body
            );
            // Forward the upstream error body as a single SSE frame.
            yield Ok::<Bytes, std::io::Error>(Bytes::from(codec::encode_raw(&format!(
                "data: {}",
                body
            ))));
            cleanup.finish(RequestStatus::Error);
            return;
        }

        let mut decoder = SseDecoder::new();
        let mut correlator = CallCorrelator::new();
        let mut byte_stream = response.bytes_stream();
        let mut stream_failed = false;

        while let Some(chunk_result) = byte_stream.next().await {
            match chunk_result {
                Ok(chunk) => {
                    for mut event in decoder.feed(&chunk) {
                        let wire =
                            relay_event(&mut event, &mut correlator, &locations, &trace_id);
                        yield Ok::<Bytes, std::io::Error>(Bytes::from(wire));
                    }
                }
                Err(e) => {
                    error!(
                        "[{}] Stream chunk error for {}: {}",
                        trace_id, request_id, e
                    );
                    // Frames already sent stand; append a terminal error
                    // frame rather than closing silently.
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(codec::encode_payload(
                        &json!({"error": format!("Upstream stream failed: {}", e)}),
                    )));
                    stream_failed = true;
                    break;
                }
            }
        }

        if stream_failed {
            cleanup.finish(RequestStatus::Error);
        } else {
            if let Some(mut event) = decoder.finish() {
                let wire = relay_event(&mut event, &mut correlator, &locations, &trace_id);
                yield Ok::<Bytes, std::io::Error>(Bytes::from(wire));
            }
            info!("[{}] Stream for {} ended normally", trace_id, request_id);
            cleanup.finish(RequestStatus::Completed);
        }
    };

    match Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(Body::from_stream(sse_stream))
    {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to build SSE response: {}", e);
            error_response(ProxyErrorKind::UpstreamError, "Failed to open event stream")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_event_passthrough_keeps_raw_bytes() {
        let locations = LocationStore::new();
        let mut correlator = CallCorrelator::new();
        let mut event = StreamEvent {
            raw: "data: {\"content\": {\"parts\": [{\"text\": \"hi\"}]}}".to_string(),
            parsed: Some(json!({"content": {"parts": [{"text": "hi"}]}})),
        };

        let wire = relay_event(&mut event, &mut correlator, &locations, "test00");
        // Nothing matched, so the original bytes (spacing included) relay.
        assert_eq!(wire, "data: {\"content\": {\"parts\": [{\"text\": \"hi\"}]}}\n\n");
    }

    #[test]
    fn test_relay_event_rewrites_matched_response() {
        let locations = LocationStore::new();
        locations
            .put_json(BROWSER_SOURCE, &json!({"lat": 25.03, "lng": 121.56}))
            .unwrap();
        let mut correlator = CallCorrelator::new();
        correlator.arm(Some("fc-1"));

        let mut event = StreamEvent {
            raw: String::new(),
            parsed: Some(json!({
                "content": {"parts": [{"functionResponse": {
                    "name": "get_current_place",
                    "id": "fc-1",
                    "response": {"status": "error"}
                }}]}
            })),
        };

        let wire = relay_event(&mut event, &mut correlator, &locations, "test00");
        assert!(wire.starts_with("data: "));
        assert!(wire.ends_with("\n\n"));
        let payload: Value = serde_json::from_str(wire.trim().strip_prefix("data: ").unwrap()).unwrap();
        let response = &payload["content"]["parts"][0]["functionResponse"]["response"];
        assert_eq!(response["coordinates"]["lat"], 25.03);
        assert_eq!(response["source"], "browser");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_guard_evicts_on_drop() {
        // Simulates the client disconnecting: the relay generator (and with
        // it the guard) is dropped before any terminal state is reached.
        let pending = Arc::new(PendingRequestStore::new());
        let id = pending.register(json!({}));
        pending.claim(&id);

        drop(StreamCleanup::new(
            pending.clone(),
            id.clone(),
            Duration::from_secs(60),
        ));

        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;
        assert!(pending.get(&id).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_guard_evicts_after_finish() {
        let pending = Arc::new(PendingRequestStore::new());
        let id = pending.register(json!({}));
        pending.claim(&id);

        let cleanup = StreamCleanup::new(pending.clone(), id.clone(), Duration::from_secs(60));
        cleanup.finish(RequestStatus::Completed);

        // Entry survives the grace period, then goes away.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(pending.get(&id).is_some());
        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert!(pending.get(&id).is_none());
    }

    #[test]
    fn test_relay_event_non_json_frame() {
        let locations = LocationStore::new();
        let mut correlator = CallCorrelator::new();
        let mut event = StreamEvent {
            raw: "data: oops not json".to_string(),
            parsed: None,
        };
        let wire = relay_event(&mut event, &mut correlator, &locations, "test00");
        assert_eq!(wire, "data: oops not json\n\n");
    }
}
