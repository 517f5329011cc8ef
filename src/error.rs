use std::error::Error;

/// Failure reported by a [`Sink`](crate::sink::Sink).
///
/// The logger never surfaces these to callers of the facade; they are
/// counted per sink and reported once on stderr.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink is closed")]
    Closed,

    #[error("sink was not initialized")]
    NotInitialized,

    #[error("sink buffer is full, record dropped")]
    Full,

    #[error("sink needs a running tokio runtime")]
    NoRuntime,

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transport error: {0}")]
    Transport(Box<dyn Error + Send + Sync>),
}

/// Error returned when building a [`Logger`](crate::logger::Logger) or
/// installing the process-wide instance.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("a sink named {0:?} is already registered")]
    DuplicateSink(String),

    #[error("sink name {0:?} is reserved")]
    ReservedName(String),

    #[error("sink {name:?} failed to initialize: {source}")]
    SinkInit {
        name: String,
        #[source]
        source: SinkError,
    },

    #[error("the process-wide logger is already initialized")]
    AlreadyInitialized,

    #[error("failed to install the global tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
}
