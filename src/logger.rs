use crate::context::LogContext;
use crate::error::InitError;
use crate::fields::{extract_fields, Body, ERROR_CAUSES};
use crate::init::LoggerConfig;
use crate::record::{Field, Level, LogRecord};
use crate::registry::{SinkRegistry, SinkStats};
use crate::sampling::Sampler;
use std::error::Error;
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Renders records and fans them out to the console and the registered
/// sinks.
///
/// A `Logger` is safe to share between threads; every facade method takes
/// `&self`. Nothing here returns an error to the caller once the logger is
/// built: encoding and delivery problems are absorbed.
pub struct Logger {
    level: Level,
    console: bool,
    sinks: SinkRegistry,
    sampler: Option<Sampler>,
    closed: AtomicBool,
    /// Records rendered and handed to the outputs.
    emitted: AtomicU64,
    /// Records rejected by the sampler.
    sampled_out: AtomicU64,
}

impl Logger {
    /// Register and initialize every sink in `config`.
    pub fn new(config: LoggerConfig) -> Result<Self, InitError> {
        let mut sinks = SinkRegistry::new();
        for sink in config.sinks {
            sinks.register(sink)?;
        }
        if let Err(e) = sinks.initialize_all() {
            // release whatever came up before the failing sink
            sinks.close_all();
            return Err(e);
        }

        Ok(Logger {
            level: config.level,
            console: config.console,
            sinks,
            sampler: config.sampling.map(Sampler::new),
            closed: AtomicBool::new(false),
            emitted: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
        })
    }

    /// Info-level logger writing to stderr only.
    pub fn console_only() -> Self {
        Logger {
            level: Level::Info,
            console: true,
            sinks: SinkRegistry::new(),
            sampler: None,
            closed: AtomicBool::new(false),
            emitted: AtomicU64::new(0),
            sampled_out: AtomicU64::new(0),
        }
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level && !self.closed.load(Ordering::Acquire)
    }

    /// Render `record` once and write it to every output.
    pub fn emit(&self, record: &LogRecord) {
        if !self.enabled(record.level) {
            return;
        }
        if let Some(sampler) = &self.sampler {
            if !sampler.admit(record.level, &record.message) {
                self.sampled_out.fetch_add(1, Ordering::Relaxed);
                return;
            }
        }

        let line = match record.to_json_line() {
            Ok(line) => line,
            Err(e) => {
                eprintln!("failed to encode log record: {}", e);
                return;
            }
        };

        if self.console {
            let _ = std::io::stderr().lock().write_all(&line);
        }
        self.sinks.fan_out(&line);
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// General form behind the facade verbs.
    pub fn log_event<C: LogContext + ?Sized>(
        &self,
        level: Level,
        ctx: &C,
        message: &str,
        body: Option<Body<'_>>,
    ) {
        if !self.enabled(level) {
            return;
        }
        let fields = extract_fields(ctx, body.as_ref(), None, None);
        self.emit(&LogRecord::new(level, message, fields));
    }

    /// Record an inbound call before it is handled.
    pub fn log_request<C: LogContext + ?Sized>(&self, ctx: &C, body: Option<Body<'_>>) {
        self.log_request_with_headers(ctx, body, &[]);
    }

    pub fn log_request_with_headers<C: LogContext + ?Sized>(
        &self,
        ctx: &C,
        body: Option<Body<'_>>,
        headers: &[(&str, &str)],
    ) {
        if !self.enabled(Level::Info) {
            return;
        }
        let fields = extract_fields(ctx, body.as_ref(), None, Some(headers));
        self.emit(&LogRecord::new(Level::Info, "request", fields));
    }

    /// Record the outcome of a call once it has been handled.
    pub fn log_response<C: LogContext + ?Sized>(&self, ctx: &C, body: Option<Body<'_>>, status: u16) {
        self.log_response_with_headers(ctx, body, status, &[]);
    }

    pub fn log_response_with_headers<C: LogContext + ?Sized>(
        &self,
        ctx: &C,
        body: Option<Body<'_>>,
        status: u16,
        headers: &[(&str, &str)],
    ) {
        if !self.enabled(Level::Info) {
            return;
        }
        let fields = extract_fields(ctx, body.as_ref(), Some(status), Some(headers));
        self.emit(&LogRecord::new(Level::Info, "response", fields));
    }

    /// Error-level record whose message is `err`'s display text.
    pub fn log_error<C: LogContext + ?Sized>(&self, ctx: &C, err: &dyn Error) {
        self.log_failure(Level::Error, ctx, err);
    }

    pub fn log_info<C: LogContext + ?Sized>(&self, ctx: &C, message: &str) {
        self.log_event(Level::Info, ctx, message, None);
    }

    pub fn log_warning<C: LogContext + ?Sized>(&self, ctx: &C, message: &str) {
        self.log_event(Level::Warning, ctx, message, None);
    }

    /// Log `err` at `level` and hand it back, so a call site can log and
    /// propagate in one expression:
    ///
    /// ```ignore
    /// return Err(logger.log_return(&ctx, Level::Warning, err));
    /// ```
    pub fn log_return<C, E>(&self, ctx: &C, level: Level, err: E) -> E
    where
        C: LogContext + ?Sized,
        E: Error,
    {
        self.log_failure(level, ctx, &err);
        err
    }

    fn log_failure<C: LogContext + ?Sized>(&self, level: Level, ctx: &C, err: &dyn Error) {
        if !self.enabled(level) {
            return;
        }
        let mut fields = extract_fields(ctx, None, None, None);
        let causes = error_causes(err);
        if !causes.is_empty() {
            fields.push(Field::new(ERROR_CAUSES, causes));
        }
        self.emit(&LogRecord::new(level, err.to_string(), fields));
    }

    /// Ask every sink to flush.
    pub fn sync(&self) {
        if self.console {
            let _ = std::io::stderr().flush();
        }
        self.sinks.sync_all();
    }

    /// Flush and close every sink. Later calls, and any records emitted
    /// afterwards, are ignored.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.sinks.sync_all();
        self.sinks.close_all();
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn sink_names(&self) -> Vec<&str> {
        self.sinks.names()
    }

    pub fn sink_stats(&self, name: &str) -> Option<SinkStats> {
        self.sinks.stats(name)
    }

    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    pub fn sampled_out(&self) -> u64 {
        self.sampled_out.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("console", &self.console)
            .field("sinks", &self.sinks.names())
            .field("sampling", &self.sampler.is_some())
            .field("closed", &self.is_shut_down())
            .finish()
    }
}

fn error_causes(err: &dyn Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::CaptureSink;
    use crate::context::RequestContext;
    use crate::sampling::SamplingConfig;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(thiserror::Error, Debug)]
    #[error("query failed")]
    struct QueryError {
        #[source]
        source: std::io::Error,
    }

    fn capturing(level: Level) -> (Logger, CaptureSink) {
        let capture = CaptureSink::new("capture");
        let config = LoggerConfig {
            level,
            console: false,
            ..LoggerConfig::default()
        }
        .with_sink(Arc::new(capture.clone()));
        (Logger::new(config).unwrap(), capture)
    }

    #[test]
    fn error_records_carry_message_and_causes() {
        let (logger, capture) = capturing(Level::Info);
        let ctx = RequestContext::linked("worker", "", "", "cid-e");
        let err = QueryError {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timeout"),
        };

        logger.log_error(&ctx, &err);

        let records = capture.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["level"], "error");
        assert_eq!(records[0]["msg"], "query failed");
        assert_eq!(records[0]["correlation_id"], "cid-e");
        assert_eq!(records[0]["error.causes"], serde_json::json!(["socket timeout"]));
    }

    #[test]
    fn log_return_hands_back_the_same_error() {
        let (logger, capture) = capturing(Level::Info);
        let ctx = RequestContext::new();
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing row");

        let returned = logger.log_return(&ctx, Level::Warning, err);

        assert_eq!(returned.kind(), std::io::ErrorKind::NotFound);
        assert_eq!(returned.to_string(), "missing row");
        let records = capture.records();
        assert_eq!(records[0]["level"], "warning");
        assert_eq!(records[0]["msg"], "missing row");
        assert!(records[0].get("error.causes").is_none());
    }

    #[test]
    fn records_below_level_are_skipped() {
        let (logger, capture) = capturing(Level::Warning);
        let ctx = RequestContext::new();

        logger.log_info(&ctx, "quiet");
        logger.log_request(&ctx, None);
        logger.log_warning(&ctx, "loud");

        let records = capture.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["msg"], "loud");
    }

    #[test]
    fn shutdown_is_idempotent_and_silences_the_logger() {
        let (logger, capture) = capturing(Level::Info);
        let ctx = RequestContext::new();

        logger.log_info(&ctx, "before");
        logger.shutdown();
        logger.shutdown();
        logger.log_info(&ctx, "after");

        assert!(logger.is_shut_down());
        assert_eq!(capture.len(), 1);
        assert_eq!(logger.emitted(), 1);
    }

    #[test]
    fn sampling_limits_repeated_messages() {
        let capture = CaptureSink::new("capture");
        let config = LoggerConfig {
            console: false,
            sampling: Some(SamplingConfig {
                initial: 2,
                thereafter: 0,
                tick: Duration::from_secs(60),
            }),
            ..LoggerConfig::default()
        }
        .with_sink(Arc::new(capture.clone()));
        let logger = Logger::new(config).unwrap();
        let ctx = RequestContext::new();

        for _ in 0..5 {
            logger.log_info(&ctx, "hot path");
        }
        logger.log_info(&ctx, "cold path");

        assert_eq!(capture.len(), 3);
        assert_eq!(logger.sampled_out(), 3);
    }

    struct Tracked {
        name: &'static str,
        fail: bool,
        closed: AtomicBool,
    }

    impl Tracked {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Tracked {
                name,
                fail,
                closed: AtomicBool::new(false),
            })
        }
    }

    impl crate::sink::Sink for Tracked {
        fn name(&self) -> &str {
            self.name
        }

        fn initialize(&self) -> Result<(), crate::error::SinkError> {
            if self.fail {
                return Err(crate::error::SinkError::NoRuntime);
            }
            Ok(())
        }

        fn write(&self, buf: &[u8]) -> Result<usize, crate::error::SinkError> {
            Ok(buf.len())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn failed_initialization_closes_earlier_sinks() {
        let ready = Tracked::new("ready", false);
        let broken = Tracked::new("broken", true);
        let config = LoggerConfig::default()
            .with_sink(ready.clone())
            .with_sink(broken.clone());

        match Logger::new(config) {
            Err(InitError::SinkInit { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("expected SinkInit, got {:?}", other.map(|_| ())),
        }
        assert!(ready.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn duplicate_sink_names_fail_construction() {
        let config = LoggerConfig::default()
            .with_sink(Arc::new(CaptureSink::new("same")))
            .with_sink(Arc::new(CaptureSink::new("same")));
        assert!(matches!(Logger::new(config), Err(InitError::DuplicateSink(_))));
    }
}
