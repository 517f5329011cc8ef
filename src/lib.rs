//! Structured JSON logging for request, response and error events.
//!
//! Call sites hand a [`LogContext`] (usually a [`RequestContext`]) and an
//! optional payload to one of the facade verbs; the crate derives a fixed
//! set of fields from them, renders one JSON line and writes it to stderr
//! and to every registered [`Sink`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use fieldlog::{facade, Body, FnSink, LoggerConfig, RequestContext};
//!
//! let sink = FnSink::new("audit", |line: &[u8]| {
//!     let _ = line;
//! });
//! fieldlog::initialize(LoggerConfig::default().with_sink(Arc::new(sink))).unwrap();
//!
//! let ctx = RequestContext::builder().method("GET").url("https://api.example.com/items").build();
//! facade::log_request(&ctx, Some(Body::json(br#"{"page": 1}"#)));
//! facade::log_response(&ctx, None, 204);
//! fieldlog::shutdown();
//! ```

pub mod capture;
pub mod channel_sink;
pub mod context;
pub mod env;
pub mod error;
pub mod facade;
pub mod fields;
pub mod file_sink;
pub mod init;
pub mod layer;
pub mod logger;
pub mod noop_sink;
pub mod record;
pub mod registry;
pub mod sampling;
pub mod sink;
pub mod transport;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "kafka")]
pub mod kafka;

pub use capture::CaptureSink;
pub use channel_sink::{ChannelConfig, ChannelSink};
pub use context::{ContextUrl, LogContext, RequestContext, CORRELATION_ID_HEADER};
pub use error::{InitError, SinkError};
pub use fields::{extract_fields, Body};
pub use file_sink::FileSink;
pub use init::{initialize, init_tracing, logger, shutdown, LoggerConfig};
pub use layer::ForwardLayer;
pub use logger::Logger;
pub use noop_sink::NoopSink;
pub use record::{Field, Level, LogRecord};
pub use sampling::SamplingConfig;
pub use sink::{FnSink, Sink};
pub use transport::Transport;
