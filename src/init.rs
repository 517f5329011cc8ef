use crate::error::InitError;
use crate::layer::ForwardLayer;
use crate::logger::Logger;
use crate::record::Level;
use crate::sampling::SamplingConfig;
use crate::sink::Sink;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Logger configuration.
///
/// **Fields**
/// - `level`: minimum level that is emitted, `Info` by default.
/// - `console`: if `true`, every record is also written to stderr.
/// - `sinks`: additional destinations; names must be unique and may not
///   be `stderr`. Empty means console-only.
/// - `sampling`: optional per-process volume limit, off by default.
#[derive(Clone)]
pub struct LoggerConfig {
    pub level: Level,
    pub console: bool,
    pub sinks: Vec<Arc<dyn Sink>>,
    pub sampling: Option<SamplingConfig>,
}

impl LoggerConfig {
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Level::Info,
            console: true,
            sinks: Vec::new(),
            sampling: None,
        }
    }
}

impl fmt::Debug for LoggerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.sinks.iter().map(|s| s.name()).collect();
        f.debug_struct("LoggerConfig")
            .field("level", &self.level)
            .field("console", &self.console)
            .field("sinks", &names)
            .field("sampling", &self.sampling)
            .finish()
    }
}

static INSTANCE: OnceLock<Arc<Logger>> = OnceLock::new();

/// Build the process-wide logger from `config`.
///
/// **Effects**
///
/// Registers and initializes every sink, then installs the logger used by
/// the free functions in [`crate::facade`]. This must happen before
/// concurrent logging starts; the instance cannot be replaced later.
///
/// **Returns**
/// - `Err(InitError::AlreadyInitialized)` if a logger is already installed,
///   including one installed lazily by an earlier log call. The sinks of
///   the rejected config are closed.
pub fn initialize(config: LoggerConfig) -> Result<(), InitError> {
    if INSTANCE.get().is_some() {
        return Err(InitError::AlreadyInitialized);
    }
    let logger = Arc::new(Logger::new(config)?);
    INSTANCE.set(logger).map_err(|rejected| {
        rejected.shutdown();
        InitError::AlreadyInitialized
    })
}

/// Initialize with defaults: info level, console only.
pub fn initialize_default() -> Result<(), InitError> {
    initialize(LoggerConfig::default())
}

/// The process-wide logger. If [`initialize`] has not run yet, a
/// console-only logger is installed on first use.
pub fn logger() -> &'static Arc<Logger> {
    INSTANCE.get_or_init(|| Arc::new(Logger::console_only()))
}

/// Whether a process-wide logger is installed.
pub fn is_initialized() -> bool {
    INSTANCE.get().is_some()
}

/// Flush and close the sinks of the process-wide logger. Safe to call more
/// than once and before initialization.
pub fn shutdown() {
    if let Some(logger) = INSTANCE.get() {
        logger.shutdown();
    }
}

/// Initialize the process-wide logger and route `tracing` events into it.
///
/// **Effects**
///
/// Calls [`initialize`], then installs a [`Registry`] combined with a
/// [`ForwardLayer`] as the global default subscriber, so `tracing` macros
/// anywhere in the process produce records on the same console and sinks
/// as the facade verbs.
pub fn init_tracing(config: LoggerConfig) -> Result<(), InitError> {
    initialize(config)?;
    let subscriber = Registry::default().with(ForwardLayer::global());
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
