use taipei_gateway::modules::logger;
use taipei_gateway::proxy;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    logger::init_logger();

    let config = proxy::GatewayConfig::from_env();

    info!("--------------------------------------------------");
    info!("Taipei gateway starting...");
    info!("Bind: {}:{}", config.host, config.port);
    info!("Upstream: {}", config.upstream_base_url);
    info!(
        "Timeouts: connect={}s request={}s stream={}s",
        config.connect_timeout_secs, config.request_timeout_secs, config.stream_timeout_secs
    );
    info!("--------------------------------------------------");

    if let Err(e) = proxy::server::run(config).await {
        error!("Gateway server failed: {}", e);
        std::process::exit(1);
    }
}
