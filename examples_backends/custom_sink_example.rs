use std::sync::Arc;

use fieldlog::{facade, Body, InitError, LoggerConfig, RequestContext, Sink, SinkError};

/// Example of integrating a completely custom destination by implementing
/// the `Sink` trait directly. Imagine this forwards to some in-house
/// audit service for which this crate does not provide a built-in sink.
struct AuditSink;

impl Sink for AuditSink {
    fn name(&self) -> &str {
        "audit"
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        // Here you would hand the bytes to your own client library.
        // For the sake of example we just print the record.
        print!("[audit] {}", String::from_utf8_lossy(buf));
        Ok(buf.len())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("payment declined")]
struct Declined;

fn charge(ctx: &RequestContext) -> Result<(), Declined> {
    Err(facade::log_return(ctx, fieldlog::Level::Warning, Declined))
}

fn main() -> Result<(), InitError> {
    fieldlog::initialize(LoggerConfig::default().with_sink(Arc::new(AuditSink)))?;

    let ctx = RequestContext::builder()
        .source("checkout")
        .method("POST")
        .url("https://shop.example.com/orders")
        .user_id("user-42")
        .build();

    facade::log_request(&ctx, Some(Body::json(br#"{"sku": "A-1", "qty": 2}"#)));
    if let Err(err) = charge(&ctx) {
        facade::log_error(&ctx, &err);
        facade::log_response(&ctx, Some(Body::serialize(&serde_json::json!({"error": err.to_string()}))), 402);
    }

    fieldlog::shutdown();
    Ok(())
}
