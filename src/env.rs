//! Environment variable names used by this crate for convenient
//! configuration from services.
//!
//! These are purely helpers; [`Logger`](crate::logger::Logger) and the
//! sink types remain decoupled from environment access.

use crate::error::SinkError;
use crate::init::LoggerConfig;
use crate::record::{Level, ParseLevelError};
use crate::sampling::SamplingConfig;
use crate::sink::Sink;
use std::sync::Arc;

/// Minimum level, e.g. `info` or `warning`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// `false`/`0`/`off` disables the stderr copy of every record.
pub const LOG_CONSOLE_ENV: &str = "LOG_CONSOLE";

/// Records kept per level and message each second before sampling starts.
pub const LOG_SAMPLING_INITIAL_ENV: &str = "LOG_SAMPLING_INITIAL";

/// After the initial burst, keep every n-th record.
pub const LOG_SAMPLING_THEREAFTER_ENV: &str = "LOG_SAMPLING_THEREAFTER";

/// Collector URL for the HTTP sink, e.g. `http://127.0.0.1:8686/logs`.
pub const LOG_SINK_HTTP_URL_ENV: &str = "LOG_SINK_HTTP_URL";

/// Optional basic-auth user for the HTTP sink.
pub const LOG_SINK_HTTP_USER_ENV: &str = "LOG_SINK_HTTP_USER";

/// Optional basic-auth password for the HTTP sink.
pub const LOG_SINK_HTTP_PASSWORD_ENV: &str = "LOG_SINK_HTTP_PASSWORD";

/// Comma-separated Kafka brokers.
pub const LOG_SINK_KAFKA_BROKERS_ENV: &str = "LOG_SINK_KAFKA_BROKERS";

/// Kafka topic receiving records.
pub const LOG_SINK_KAFKA_TOPIC_ENV: &str = "LOG_SINK_KAFKA_TOPIC";

/// Error returned when an environment variable holds an unusable value.
#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error(transparent)]
    Level(#[from] ParseLevelError),

    #[error("{key} must be a non-negative integer, got {value:?}")]
    Number { key: &'static str, value: String },

    #[error("{key} must be a boolean, got {value:?}")]
    Bool { key: &'static str, value: String },

    #[error("failed to build sink from environment: {0}")]
    Sink(#[from] SinkError),
}

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// [`LoggerConfig`] from the process environment, without sinks.
pub fn config_from_env() -> Result<LoggerConfig, EnvError> {
    config_from_lookup(|key| std::env::var(key).ok())
}

/// Same as [`config_from_env`] with an explicit variable source.
pub fn config_from_lookup<F>(lookup: F) -> Result<LoggerConfig, EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = LoggerConfig::default();

    if let Some(level) = lookup(LOG_LEVEL_ENV) {
        config.level = level.parse::<Level>()?;
    }
    if let Some(console) = lookup(LOG_CONSOLE_ENV) {
        config.console = parse_bool(LOG_CONSOLE_ENV, &console)?;
    }

    let initial = lookup(LOG_SAMPLING_INITIAL_ENV)
        .map(|v| parse_u64(LOG_SAMPLING_INITIAL_ENV, &v))
        .transpose()?;
    let thereafter = lookup(LOG_SAMPLING_THEREAFTER_ENV)
        .map(|v| parse_u64(LOG_SAMPLING_THEREAFTER_ENV, &v))
        .transpose()?;
    if initial.is_some() || thereafter.is_some() {
        let defaults = SamplingConfig::default();
        config.sampling = Some(SamplingConfig {
            initial: initial.unwrap_or(defaults.initial),
            thereafter: thereafter.unwrap_or(defaults.thereafter),
            ..defaults
        });
    }

    Ok(config)
}

/// Sinks described by the `LOG_SINK_*` variables. Backends whose cargo
/// feature is disabled are skipped.
pub fn sinks_from_env() -> Result<Vec<Arc<dyn Sink>>, EnvError> {
    #[allow(unused_mut)]
    let mut sinks: Vec<Arc<dyn Sink>> = Vec::new();

    #[cfg(feature = "http")]
    {
        use crate::channel_sink::ChannelConfig;
        use crate::http::{http_sink, HttpConfig};

        if let Ok(url) = std::env::var(LOG_SINK_HTTP_URL_ENV) {
            let config = HttpConfig {
                url,
                user: std::env::var(LOG_SINK_HTTP_USER_ENV).ok(),
                password: std::env::var(LOG_SINK_HTTP_PASSWORD_ENV).ok(),
            };
            sinks.push(Arc::new(http_sink("http", config, ChannelConfig::default())));
        }
    }

    #[cfg(feature = "kafka")]
    {
        use crate::kafka::KafkaSink;

        if let Ok(brokers) = std::env::var(LOG_SINK_KAFKA_BROKERS_ENV) {
            let topic = env_or(LOG_SINK_KAFKA_TOPIC_ENV, "logs");
            sinks.push(Arc::new(KafkaSink::new("kafka", &brokers, &topic)?));
        }
    }

    Ok(sinks)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, EnvError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EnvError::Bool {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_u64(key: &'static str, value: &str) -> Result<u64, EnvError> {
    value.trim().parse().map_err(|_| EnvError::Number {
        key,
        value: value.to_string(),
    })
}
