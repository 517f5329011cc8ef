use std::error::Error;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fieldlog::{
    Body, ChannelConfig, ChannelSink, FileSink, InitError, Logger, LoggerConfig, RequestContext,
    Sink, SinkError, Transport,
};
use serde_json::Value;

#[derive(Default)]
struct Collector {
    lines: Mutex<Vec<Vec<u8>>>,
}

#[async_trait]
impl Transport for Collector {
    async fn send(&self, batch: &[Vec<u8>]) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.lines.lock().unwrap().extend_from_slice(batch);
        Ok(())
    }
}

fn quiet(sink: Arc<dyn Sink>) -> LoggerConfig {
    LoggerConfig {
        console: false,
        ..LoggerConfig::default()
    }
    .with_sink(sink)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn channel_sink_delivers_in_background() {
    let sink = Arc::new(ChannelSink::new(
        "collector",
        Collector::default(),
        ChannelConfig::default(),
    ));
    let logger = Logger::new(quiet(sink.clone())).unwrap();
    let ctx = RequestContext::builder().correlation_id("cid-bg").build();

    logger.log_request(&ctx, Some(Body::json(br#"{"q": "x"}"#)));
    logger.log_response(&ctx, None, 200);
    logger.log_warning(&ctx, "slow downstream");
    logger.sync();
    logger.shutdown();
    sink.shutdown().await;

    let lines = sink.transport().lines.lock().unwrap().clone();
    assert_eq!(lines.len(), 3);
    let records: Vec<Value> = lines
        .iter()
        .map(|line| serde_json::from_slice(line).unwrap())
        .collect();
    assert!(records.iter().all(|r| r["correlation_id"] == "cid-bg"));
    assert_eq!(records[0]["body"], r#"{"q":"x"}"#);
    assert_eq!(records[1]["http.status_code"], 200);
    assert_eq!(records[2]["level"], "warning");

    assert_eq!(sink.stats().delivered.load(Ordering::Relaxed), 3);
    assert_eq!(logger.sink_stats("collector").unwrap().written, 3);
}

#[test]
fn channel_sink_outside_runtime_fails_initialization() {
    let sink = Arc::new(ChannelSink::new(
        "collector",
        Collector::default(),
        ChannelConfig::default(),
    ));

    match Logger::new(quiet(sink)) {
        Err(InitError::SinkInit { name, source }) => {
            assert_eq!(name, "collector");
            assert!(matches!(source, SinkError::NoRuntime));
        }
        other => panic!("expected SinkInit error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn file_sink_receives_every_record() {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("fieldlog_sinks_{}.log", nanos));

    let logger = Logger::new(quiet(Arc::new(FileSink::new("file", &path)))).unwrap();
    let ctx = RequestContext::new();
    logger.log_info(&ctx, "first");
    logger.log_info(&ctx, "second");
    logger.shutdown();

    let text = fs::read_to_string(&path).unwrap();
    let messages: Vec<String> = text
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap()["msg"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(messages, vec!["first", "second"]);

    fs::remove_file(&path).unwrap();
}

#[test]
fn closed_sink_does_not_disturb_other_outputs() {
    let file = Arc::new(FileSink::new("never-opened", std::env::temp_dir().join("fieldlog_unused.log")));
    let capture = fieldlog::CaptureSink::new("capture");
    let mut config = quiet(Arc::new(capture.clone()));
    config.sinks.push(file.clone());
    let logger = Logger::new(config).unwrap();

    // Closing behind the logger's back makes every write fail.
    file.close();
    let ctx = RequestContext::new();
    logger.log_info(&ctx, "one");
    logger.log_info(&ctx, "two");

    assert_eq!(capture.len(), 2);
    let stats = logger.sink_stats("never-opened").unwrap();
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.written, 0);
}
