// HTTP client builders for talking to the agent runtime.
// Two clients with different timeout profiles: a plain one for
// request/response proxying, and a streaming one whose overall timeout is
// long enough to cover a full multi-minute SSE generation.

use std::time::Duration;

use crate::proxy::config::GatewayConfig;

/// Timeout profile for an upstream client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl HttpClientConfig {
    pub fn plain(config: &GatewayConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub fn streaming(config: &GatewayConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            request_timeout: Duration::from_secs(config.stream_timeout_secs),
        }
    }
}

/// Build a configured reqwest client from the given timeout profile.
pub fn build_http_client(config: &HttpClientConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .build()
}
