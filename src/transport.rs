use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of rendered records.
///
/// Implementations move bytes to a concrete backend (an HTTP collector, a
/// message bus, etc). They are driven by a
/// [`ChannelSink`](crate::channel_sink::ChannelSink) from a background
/// task and are never awaited on the thread that emitted the record.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver one batch of newline-terminated JSON records.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the batch.
    /// - `Err(..)` on network, protocol or status failures. The batch is
    ///   retried with backoff a bounded number of times and then dropped.
    async fn send(&self, batch: &[Vec<u8>]) -> Result<(), Box<dyn Error + Send + Sync>>;

    /// Flush any buffering done by the transport itself.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }

    /// Release connections. Called once after the last batch.
    async fn close(&self) {}
}
