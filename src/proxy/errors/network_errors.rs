use crate::proxy::common::errors::ProxyErrorKind;

/// Categories of upstream connection failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorCategory {
    Dns,
    Connection,
    Timeout,
    Unknown,
}

/// Classification of a failed upstream call: which error kind to surface and
/// the detail message to attach.
#[derive(Debug, Clone)]
pub struct NetworkErrorInfo {
    pub category: NetworkErrorCategory,
    pub kind: ProxyErrorKind,
    pub detail: String,
}

/// Classifies a [`reqwest::Error`] from an upstream call into the gateway
/// error kind it should surface (504 for timeouts, 502 for everything that
/// never reached the runtime).
pub fn classify_network_error(error: &reqwest::Error) -> NetworkErrorInfo {
    let error_str = error.to_string().to_lowercase();

    if error.is_timeout() {
        return NetworkErrorInfo {
            category: NetworkErrorCategory::Timeout,
            kind: ProxyErrorKind::UpstreamTimeout,
            detail: "Connection to agent runtime timed out - the AI may need more time to process your request".into(),
        };
    }

    if error.is_connect() && (error_str.contains("dns") || error_str.contains("resolve")) {
        return NetworkErrorInfo {
            category: NetworkErrorCategory::Dns,
            kind: ProxyErrorKind::UpstreamError,
            detail: "Cannot resolve the agent runtime's host name".into(),
        };
    }

    if error.is_connect() {
        return NetworkErrorInfo {
            category: NetworkErrorCategory::Connection,
            kind: ProxyErrorKind::UpstreamError,
            detail: "Cannot connect to the agent runtime - is it running?".into(),
        };
    }

    NetworkErrorInfo {
        category: NetworkErrorCategory::Unknown,
        kind: ProxyErrorKind::UpstreamError,
        detail: format!("Upstream request failed: {}", error),
    }
}
