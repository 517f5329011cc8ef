use crate::error::SinkError;
use crate::sink::Sink;

/// A sink that simply drops all records.
///
/// Useful for measuring the overhead of the logger itself without any
/// external I/O.
#[derive(Debug, Clone, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn name(&self) -> &str {
        "noop"
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        Ok(buf.len())
    }
}
