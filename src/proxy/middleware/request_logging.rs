use axum::{body::Body, http::Request, middleware::Next, response::Response};
use tracing::{debug, info};

/// Generate a short lowercase trace id for correlating a request's log lines.
pub fn new_trace_id() -> String {
    rand::Rng::sample_iter(rand::thread_rng(), &rand::distributions::Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_lowercase()
}

/// Axum middleware that logs method, path, status, and duration per request.
///
/// Streaming responses are logged when their headers go out; the body keeps
/// flowing after the log line.
pub async fn request_logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let trace_id = new_trace_id();

    debug!("[{}] --> {} {}", trace_id, method, path);
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        "[{}] {} {} -> {} ({} ms)",
        trace_id,
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis()
    );

    response
}
