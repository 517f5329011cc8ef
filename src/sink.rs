use crate::error::SinkError;
use std::fmt;

/// Destination for rendered log records.
///
/// Every record reaches the sink as one newline-terminated JSON line. The
/// logger calls [`write`](Sink::write) on the caller's thread, so
/// implementations must return promptly: either hand the bytes off
/// immediately or fail fast. Errors are never propagated to the code that
/// emitted the record; the logger counts them and reports the first one per
/// sink on stderr.
pub trait Sink: Send + Sync {
    /// Unique name of the sink within one logger.
    fn name(&self) -> &str;

    /// One-time setup performed before the first write.
    ///
    /// Default implementation is a no-op.
    fn initialize(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Accept one rendered record.
    ///
    /// **Returns**
    /// - `Ok(n)` with the number of bytes consumed.
    /// - `Err(..)` if the record could not be accepted; it is dropped for
    ///   this sink only.
    fn write(&self, buf: &[u8]) -> Result<usize, SinkError>;

    /// Flush buffered records, if the sink buffers.
    ///
    /// Default implementation is a no-op.
    fn sync(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Release transport resources. Must be safe to call more than once.
    fn close(&self) {}
}

/// Sink that hands every record to a callback.
pub struct FnSink<F> {
    name: String,
    callback: F,
}

impl<F> FnSink<F>
where
    F: Fn(&[u8]) + Send + Sync,
{
    pub fn new(name: impl Into<String>, callback: F) -> Self {
        FnSink {
            name: name.into(),
            callback,
        }
    }
}

impl<F> fmt::Debug for FnSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").field("name", &self.name).finish()
    }
}

impl<F> Sink for FnSink<F>
where
    F: Fn(&[u8]) + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        (self.callback)(buf);
        Ok(buf.len())
    }
}
