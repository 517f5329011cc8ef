use std::sync::Arc;

use fieldlog::{
    env::{env_or, LOG_SINK_KAFKA_BROKERS_ENV, LOG_SINK_KAFKA_TOPIC_ENV},
    facade,
    kafka::KafkaSink,
    LoggerConfig, RequestContext,
};

fn main() {
    // Example brokers: broker1:9092,broker2:9092
    let brokers = env_or(LOG_SINK_KAFKA_BROKERS_ENV, "localhost:9092");
    let topic = env_or(LOG_SINK_KAFKA_TOPIC_ENV, "logs");

    let sink = KafkaSink::new("kafka", &brokers, &topic).expect("failed to build kafka sink");
    fieldlog::initialize(LoggerConfig::default().with_sink(Arc::new(sink)))
        .expect("failed to initialize logging");

    let ctx = RequestContext::linked("kafka-example", "GET", "/health", "");
    facade::log_info(&ctx, "kafka backend example started");
    facade::log_warning(&ctx, "simulated warning sent via Kafka backend");

    // Flushes the producer queue before exit.
    fieldlog::shutdown();
}
