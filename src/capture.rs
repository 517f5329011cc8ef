use crate::error::SinkError;
use crate::sink::Sink;
use std::sync::{Arc, Mutex, PoisonError};

/// In-memory sink keeping every record it receives.
///
/// Clones share the same buffer, so a test can register one clone and
/// inspect the other.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    name: String,
    lines: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl CaptureSink {
    pub fn new(name: impl Into<String>) -> Self {
        CaptureSink {
            name: name.into(),
            lines: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Raw lines, in arrival order.
    pub fn lines(&self) -> Vec<Vec<u8>> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every captured line parsed back into JSON. Lines that do not parse
    /// are skipped.
    pub fn records(&self) -> Vec<serde_json::Value> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(|line| serde_json::from_slice(line).ok())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl Sink for CaptureSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(buf.to_vec());
        Ok(buf.len())
    }
}
