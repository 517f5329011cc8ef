use std::sync::Arc;

use tracing::{error, info};
use fieldlog::{
    env::{config_from_env, env_or, LOG_SINK_HTTP_URL_ENV},
    facade,
    http::{http_sink, HttpConfig},
    init::init_tracing,
    ChannelConfig, LogContext, RequestContext,
};

#[tokio::main]
async fn main() {
    // Example URL: http://localhost:8686/logs (a Vector http_server source)
    let url = env_or(LOG_SINK_HTTP_URL_ENV, "http://localhost:8686/logs");

    let sink = Arc::new(http_sink("http", HttpConfig::new(url), ChannelConfig::default()));
    let config = config_from_env()
        .expect("invalid logging environment")
        .with_sink(sink.clone());
    init_tracing(config).expect("failed to initialize logging");

    let ctx = RequestContext::new();
    facade::log_info(&ctx, "http backend example started");

    // Plain `tracing` events reach the same sinks.
    info!(correlation_id = ctx.correlation_id(), "tracing event routed through the facade");
    error!(component = "example", "simulated error sent via HTTP backend");

    fieldlog::shutdown();
    sink.shutdown().await;
}
