use crate::error::SinkError;
use crate::sink::Sink;
use rdkafka::config::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Kafka sink that publishes each log record as a JSON message to a
/// configured topic.
///
/// Records are handed to librdkafka's internal queue and the delivery
/// report is never awaited. A full queue fails the write immediately.
pub struct KafkaSink {
    name: String,
    producer: FutureProducer,
    topic: String,
    closed: AtomicBool,
}

impl KafkaSink {
    /// Create a new Kafka sink.
    ///
    /// `brokers` is a comma-separated list of broker addresses.
    /// `topic` is the target Kafka topic.
    pub fn new(name: impl Into<String>, brokers: &str, topic: &str) -> Result<Self, SinkError> {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000");
        Self::with_config(name, &config, topic)
    }

    /// Create a sink from a fully specified producer configuration.
    pub fn with_config(
        name: impl Into<String>,
        config: &ClientConfig,
        topic: &str,
    ) -> Result<Self, SinkError> {
        let producer: FutureProducer = config
            .create()
            .map_err(|e| SinkError::Transport(Box::new(e)))?;

        Ok(KafkaSink {
            name: name.into(),
            producer,
            topic: topic.to_string(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Sink for KafkaSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(buf);
        match self.producer.send_result(record) {
            // Dropping the delivery future does not cancel the delivery.
            Ok(_delivery) => Ok(buf.len()),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Err(SinkError::Full)
            }
            Err((e, _)) => Err(SinkError::Transport(Box::new(e))),
        }
    }

    fn sync(&self) -> Result<(), SinkError> {
        self.producer
            .flush(Duration::from_secs(1))
            .map_err(|e| SinkError::Transport(Box::new(e)))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.producer.flush(Duration::from_secs(5)) {
            eprintln!("kafka log sink flush on close failed: {}", e);
        }
    }
}
