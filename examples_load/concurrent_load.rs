use std::sync::Arc;
use std::thread;
use std::time::Instant;

use fieldlog::{Logger, LoggerConfig, NoopSink, RequestContext, SamplingConfig};

fn main() {
    let config = LoggerConfig {
        console: false,
        sampling: Some(SamplingConfig::default()),
        ..LoggerConfig::default()
    }
    .with_sink(Arc::new(NoopSink));
    let logger = Arc::new(Logger::new(config).expect("build logger"));

    let threads = 8;
    let per_thread: u64 = 50_000;
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                let ctx = RequestContext::new();
                for _ in 0..per_thread {
                    logger.log_info(&ctx, "hot loop");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker thread");
    }

    let elapsed = start.elapsed();
    let total = threads as u64 * per_thread;
    println!("sampled config: {} calls from {} threads in {:?} (~{:.0} calls/s)",
        total,
        threads,
        elapsed,
        total as f64 / elapsed.as_secs_f64()
    );
    println!("emitted {}, sampled out {}", logger.emitted(), logger.sampled_out());
}
