use std::sync::Arc;
use std::time::Instant;

use fieldlog::{Body, Logger, LoggerConfig, NoopSink, RequestContext};

fn main() {
    let config = LoggerConfig {
        console: false,
        ..LoggerConfig::default()
    }
    .with_sink(Arc::new(NoopSink));
    let logger = Logger::new(config).expect("build logger");
    let ctx = RequestContext::builder()
        .method("GET")
        .url("https://api.example.com/items?page=1")
        .build();

    let n: u64 = 100_000;
    let start = Instant::now();

    for _ in 0..n {
        logger.log_request(&ctx, Some(Body::json(br#"{"page": 1, "size": 50}"#)));
    }

    let elapsed = start.elapsed();
    println!("default config: logged {} requests in {:?} (~{:.0} rec/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );
    println!("noop sink stats: {:?}", logger.sink_stats("noop"));
}
