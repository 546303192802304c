use serde::{Deserialize, Serialize};

// ============================================================================
// Gateway configuration
// ============================================================================

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upstream() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

/// Streaming responses may legitimately take minutes while the agent reasons,
/// so the SSE relay gets a much longer timeout than plain requests.
fn default_stream_timeout() -> u64 {
    300
}

fn default_eviction_delay() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL of the agent runtime this gateway fronts.
    #[serde(default = "default_upstream")]
    pub upstream_base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,
    /// How long a pending request survives after its stream reaches a
    /// terminal state, to tolerate late duplicate reads.
    #[serde(default = "default_eviction_delay")]
    pub eviction_delay_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream_base_url: default_upstream(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            stream_timeout_secs: default_stream_timeout(),
            eviction_delay_secs: default_eviction_delay(),
        }
    }
}

fn env_string(name: &str, current: &mut String) {
    if let Ok(v) = std::env::var(name) {
        let v = v.trim();
        if !v.is_empty() {
            *current = v.to_string();
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, current: &mut T) {
    if let Ok(v) = std::env::var(name) {
        match v.trim().parse::<T>() {
            Ok(parsed) => *current = parsed,
            Err(_) => tracing::warn!("Invalid value for {}: {:?}, ignoring", name, v),
        }
    }
}

impl GatewayConfig {
    /// Build the configuration from defaults plus `TAIPEI_GATEWAY_*`
    /// environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        env_string("TAIPEI_GATEWAY_HOST", &mut config.host);
        env_parse("TAIPEI_GATEWAY_PORT", &mut config.port);
        env_string("TAIPEI_GATEWAY_UPSTREAM_URL", &mut config.upstream_base_url);
        env_parse(
            "TAIPEI_GATEWAY_CONNECT_TIMEOUT_SECS",
            &mut config.connect_timeout_secs,
        );
        env_parse(
            "TAIPEI_GATEWAY_REQUEST_TIMEOUT_SECS",
            &mut config.request_timeout_secs,
        );
        env_parse(
            "TAIPEI_GATEWAY_STREAM_TIMEOUT_SECS",
            &mut config.stream_timeout_secs,
        );
        env_parse(
            "TAIPEI_GATEWAY_EVICTION_DELAY_SECS",
            &mut config.eviction_delay_secs,
        );

        // Trailing slash on the upstream base would double up when joining
        // paths like /run_sse.
        while config.upstream_base_url.ends_with('/') {
            config.upstream_base_url.pop();
        }

        config
    }

    pub fn upstream_url(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base_url, path)
    }
}
