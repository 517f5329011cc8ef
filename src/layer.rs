use crate::logger::Logger;
use crate::record::{Field, Level, LogRecord};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::field::{Field as TracingField, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that turns `tracing` events into records of a
/// [`Logger`], so `tracing::info!` and friends reach the same console and
/// sinks as the facade verbs.
///
/// Events below the logger's level are ignored. Event fields become record
/// fields under their own names, followed by a `target` field.
///
/// Events from the crates that carry sink traffic (see
/// [`DEFAULT_IGNORED_TARGETS`]) are never forwarded: a sink's own HTTP or
/// Kafka client would otherwise log about every delivery and feed those
/// records back into itself.
pub struct ForwardLayer {
    logger: Arc<Logger>,
    ignored_targets: Vec<String>,
    /// Events seen by the layer, before level filtering.
    pub total_events: Arc<AtomicU64>,
    /// Events handed to the logger.
    pub forwarded_events: Arc<AtomicU64>,
}

impl ForwardLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        ForwardLayer {
            logger,
            ignored_targets: DEFAULT_IGNORED_TARGETS.iter().map(|t| t.to_string()).collect(),
            total_events: Arc::new(AtomicU64::new(0)),
            forwarded_events: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Layer writing to the process-wide logger.
    pub fn global() -> Self {
        Self::new(Arc::clone(crate::init::logger()))
    }

    /// Also drop events whose target is `prefix` or one of its submodules.
    pub fn ignore_target(mut self, prefix: impl Into<String>) -> Self {
        self.ignored_targets.push(prefix.into());
        self
    }

    fn is_ignored(&self, target: &str) -> bool {
        self.ignored_targets.iter().any(|prefix| {
            target
                .strip_prefix(prefix.as_str())
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

/// Targets of the transport stacks used by the bundled sinks.
pub const DEFAULT_IGNORED_TARGETS: &[&str] = &[
    "hyper", "reqwest", "h2", "rustls", "want", "mio", "tokio", "rdkafka",
];

fn map_level(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::ERROR => Level::Error,
        tracing::Level::WARN => Level::Warning,
        tracing::Level::INFO => Level::Info,
        _ => Level::Debug,
    }
}

impl<S> Layer<S> for ForwardLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);

        let meta = event.metadata();
        let level = map_level(meta.level());
        if !self.logger.enabled(level) || self.is_ignored(meta.target()) {
            return;
        }

        let mut fields = Vec::new();
        let mut message: Option<String> = None;
        let mut visitor = FieldVisitor {
            fields: &mut fields,
            message: &mut message,
        };
        event.record(&mut visitor);
        fields.push(Field::new("target", meta.target()));

        let record = LogRecord::new(level, message.unwrap_or_default(), fields);
        self.logger.emit(&record);
        self.forwarded_events.fetch_add(1, Ordering::Relaxed);
    }
}

/// Keys that would collide with the record header are moved under
/// `fields.`.
fn field_key(name: &'static str) -> &'static str {
    match name {
        "level" => "fields.level",
        "ts" => "fields.ts",
        "msg" => "fields.msg",
        other => other,
    }
}

pub struct FieldVisitor<'a> {
    pub fields: &'a mut Vec<Field>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn push(&mut self, field: &TracingField, value: serde_json::Value) {
        self.fields.push(Field::new(field_key(field.name()), value));
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &TracingField, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &TracingField, value: i64) {
        self.push(field, serde_json::Value::from(value));
    }

    fn record_u64(&mut self, field: &TracingField, value: u64) {
        self.push(field, serde_json::Value::from(value));
    }

    fn record_f64(&mut self, field: &TracingField, value: f64) {
        self.push(field, serde_json::Value::from(value));
    }

    fn record_bool(&mut self, field: &TracingField, value: bool) {
        self.push(field, serde_json::Value::from(value));
    }

    fn record_error(&mut self, field: &TracingField, value: &(dyn std::error::Error + 'static)) {
        self.push(field, serde_json::Value::String(value.to_string()));
    }

    fn record_debug(&mut self, field: &TracingField, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, serde_json::Value::String(format!("{:?}", value)));
        }
    }
}
