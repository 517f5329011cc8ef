use crate::channel_sink::{ChannelConfig, ChannelSink};
use crate::transport::Transport;
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;

/// Configuration for [`HttpTransport`].
///
/// Batches are POSTed as NDJSON, one record per line, which is what most
/// log collectors (Vector, Fluent Bit, ClickHouse `JSONEachRow`,
/// OpenSearch ingest pipelines) accept.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Full endpoint URL, e.g. "http://127.0.0.1:8686/logs"
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl HttpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        HttpConfig {
            url: url.into(),
            user: None,
            password: None,
        }
    }
}

/// HTTP implementation of [`Transport`].
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
}

impl HttpTransport {
    /// Construct a new transport using the provided configuration.
    ///
    /// **Parameters**
    /// - `config`: [`HttpConfig`] describing the endpoint and optional
    ///   basic-auth credentials.
    pub fn new(config: HttpConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// Use a preconfigured client (timeouts, proxies, TLS roots).
    pub fn with_client(client: Client, config: HttpConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, batch: &[Vec<u8>]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let mut request = self
            .client
            .post(&self.config.url)
            .header("Content-Type", "application/x-ndjson")
            .body(batch.concat());

        if let Some(user) = &self.config.user {
            request = request.basic_auth(user, self.config.password.as_ref());
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("log collector rejected batch with status {}: {}", status, text).into())
        }
    }
}

/// Sink delivering records to an HTTP collector in the background.
pub type HttpSink = ChannelSink<HttpTransport>;

/// Build an [`HttpSink`] named `name`.
pub fn http_sink(name: impl Into<String>, config: HttpConfig, channel: ChannelConfig) -> HttpSink {
    ChannelSink::new(name, HttpTransport::new(config), channel)
}
