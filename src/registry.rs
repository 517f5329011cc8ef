use crate::error::InitError;
use crate::sink::Sink;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Name of the console stream; no sink may use it.
pub const CONSOLE_NAME: &str = "stderr";

/// Per-sink delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub written: u64,
    pub failed: u64,
}

struct SinkEntry {
    sink: Arc<dyn Sink>,
    written: AtomicU64,
    failed: AtomicU64,
    reported: AtomicBool,
}

/// Named set of sinks owned by one logger.
///
/// Sinks are registered while the logger is built and never change
/// afterwards, so fan-out needs no locking.
#[derive(Default)]
pub struct SinkRegistry {
    entries: Vec<SinkEntry>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink. Names must be unique; a duplicate is rejected rather
    /// than replacing the earlier sink.
    pub fn register(&mut self, sink: Arc<dyn Sink>) -> Result<(), InitError> {
        let name = sink.name();
        if name == CONSOLE_NAME {
            return Err(InitError::ReservedName(name.to_string()));
        }
        if self.entries.iter().any(|e| e.sink.name() == name) {
            return Err(InitError::DuplicateSink(name.to_string()));
        }
        self.entries.push(SinkEntry {
            sink,
            written: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            reported: AtomicBool::new(false),
        });
        Ok(())
    }

    /// Run `initialize` on every sink, stopping at the first failure.
    pub fn initialize_all(&self) -> Result<(), InitError> {
        for entry in &self.entries {
            entry
                .sink
                .initialize()
                .map_err(|source| InitError::SinkInit {
                    name: entry.sink.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Hand one rendered record to every sink. A failing sink loses this
    /// record; the others are unaffected.
    pub fn fan_out(&self, line: &[u8]) {
        for entry in &self.entries {
            match entry.sink.write(line) {
                Ok(_) => {
                    entry.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    entry.failed.fetch_add(1, Ordering::Relaxed);
                    if !entry.reported.swap(true, Ordering::Relaxed) {
                        eprintln!(
                            "log sink {:?} failed, dropping records: {} (further failures are not reported)",
                            entry.sink.name(),
                            e
                        );
                    }
                }
            }
        }
    }

    pub fn sync_all(&self) {
        for entry in &self.entries {
            if let Err(e) = entry.sink.sync() {
                eprintln!("log sink {:?} sync failed: {}", entry.sink.name(), e);
            }
        }
    }

    pub fn close_all(&self) {
        for entry in &self.entries {
            entry.sink.close();
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.sink.name()).collect()
    }

    pub fn stats(&self, name: &str) -> Option<SinkStats> {
        self.entries
            .iter()
            .find(|e| e.sink.name() == name)
            .map(|e| SinkStats {
                written: e.written.load(Ordering::Relaxed),
                failed: e.failed.load(Ordering::Relaxed),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSink;
    use crate::error::SinkError;

    struct Broken;

    impl Sink for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn write(&self, _buf: &[u8]) -> Result<usize, SinkError> {
            Err(SinkError::Closed)
        }
    }

    #[test]
    fn rejects_duplicate_and_reserved_names() {
        let mut registry = SinkRegistry::new();
        registry.register(Arc::new(CaptureSink::new("a"))).unwrap();

        let dup = registry.register(Arc::new(CaptureSink::new("a")));
        assert!(matches!(dup, Err(InitError::DuplicateSink(name)) if name == "a"));

        let reserved = registry.register(Arc::new(CaptureSink::new(CONSOLE_NAME)));
        assert!(matches!(reserved, Err(InitError::ReservedName(_))));

        assert_eq!(registry.names(), vec!["a"]);
    }

    #[test]
    fn failing_sink_does_not_starve_others() {
        let capture = CaptureSink::new("capture");
        let mut registry = SinkRegistry::new();
        registry.register(Arc::new(Broken)).unwrap();
        registry.register(Arc::new(capture.clone())).unwrap();

        registry.fan_out(b"x\n");
        registry.fan_out(b"y\n");

        assert_eq!(capture.len(), 2);
        assert_eq!(registry.stats("broken"), Some(SinkStats { written: 0, failed: 2 }));
        assert_eq!(registry.stats("capture"), Some(SinkStats { written: 2, failed: 0 }));
        assert_eq!(registry.stats("missing"), None);
    }
}
