use crate::error::SinkError;
use crate::sink::Sink;
use crate::transport::Transport;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, MissedTickBehavior};

/// Buffering and batching settings of a [`ChannelSink`].
///
/// **Fields**
/// - `buffer`: maximum number of records waiting in the channel; once
///   full, new records are dropped.
/// - `batch_size`: records handed to the transport per `send`.
/// - `flush_interval`: maximum time a partial batch waits.
/// - `max_retries`: extra attempts for a failed batch before it is
///   dropped.
/// - `retry_backoff`: delay before the first retry, doubled each time up
///   to ten seconds.
#[derive(Clone, Debug)]
pub struct ChannelConfig {
    pub buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            max_retries: 3,
            retry_backoff: Duration::from_millis(100),
        }
    }
}

/// Counters of a [`ChannelSink`].
#[derive(Debug, Default)]
pub struct ChannelStats {
    /// Accepted into the channel.
    pub enqueued: AtomicU64,
    /// Rejected because the channel was full.
    pub dropped: AtomicU64,
    /// Accepted by the transport.
    pub delivered: AtomicU64,
    /// Given up on after exhausting retries.
    pub failed: AtomicU64,
}

enum Message {
    Record(Vec<u8>),
    Flush,
}

/// Adapts an async [`Transport`] to the synchronous [`Sink`] contract.
///
/// `write` only enqueues into a bounded channel (drop-newest on overflow);
/// a task spawned by `initialize` batches records and hands them to the
/// transport. `initialize` must run inside a Tokio runtime.
pub struct ChannelSink<T: Transport> {
    name: String,
    transport: Arc<T>,
    config: ChannelConfig,
    sender: RwLock<Option<mpsc::Sender<Message>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
    stats: Arc<ChannelStats>,
}

impl<T: Transport> ChannelSink<T> {
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations.
    pub fn new(name: impl Into<String>, transport: T, config: ChannelConfig) -> Self {
        let config = ChannelConfig {
            buffer: config.buffer.max(16),
            batch_size: config.batch_size.max(1),
            flush_interval: config.flush_interval.max(Duration::from_millis(10)),
            ..config
        };

        ChannelSink {
            name: name.into(),
            transport: Arc::new(transport),
            config,
            sender: RwLock::new(None),
            worker: Mutex::new(None),
            closed: AtomicBool::new(false),
            stats: Arc::new(ChannelStats::default()),
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Close the channel and wait until the worker has delivered what was
    /// queued and closed the transport.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    fn try_send(&self, message: Message) -> Result<(), TrySendError<Message>> {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sender) => sender.try_send(message),
            None => Err(TrySendError::Closed(message)),
        }
    }
}

impl<T: Transport> Sink for ChannelSink<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> Result<(), SinkError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SinkError::NoRuntime)?;

        let mut sender = self.sender.write().unwrap_or_else(PoisonError::into_inner);
        if sender.is_some() || self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(self.config.buffer);
        let handle = runtime.spawn(run_worker(
            rx,
            Arc::clone(&self.transport),
            self.config.clone(),
            Arc::clone(&self.stats),
        ));

        *sender = Some(tx);
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    fn write(&self, buf: &[u8]) -> Result<usize, SinkError> {
        match self.try_send(Message::Record(buf.to_vec())) {
            Ok(()) => {
                self.stats.enqueued.fetch_add(1, Ordering::Relaxed);
                Ok(buf.len())
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::Full)
            }
            Err(TrySendError::Closed(_)) if self.closed.load(Ordering::Acquire) => {
                Err(SinkError::Closed)
            }
            Err(TrySendError::Closed(_)) => Err(SinkError::NotInitialized),
        }
    }

    fn sync(&self) -> Result<(), SinkError> {
        // A full channel means the worker is busy and will flush anyway.
        let _ = self.try_send(Message::Flush);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

async fn run_worker<T: Transport>(
    mut rx: mpsc::Receiver<Message>,
    transport: Arc<T>,
    config: ChannelConfig,
    stats: Arc<ChannelStats>,
) {
    let mut batch = Vec::with_capacity(config.batch_size);
    let mut ticker = tokio::time::interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(Message::Record(line)) => {
                    batch.push(line);
                    if batch.len() >= config.batch_size {
                        deliver(&*transport, &mut batch, &config, &stats).await;
                    }
                }
                Some(Message::Flush) => {
                    deliver(&*transport, &mut batch, &config, &stats).await;
                    if let Err(e) = transport.flush().await {
                        eprintln!("error flushing log transport: {}", e);
                    }
                }
                None => break,
            },
            _ = ticker.tick() => {
                deliver(&*transport, &mut batch, &config, &stats).await;
            }
        }
    }

    deliver(&*transport, &mut batch, &config, &stats).await;
    transport.close().await;
}

async fn deliver<T: Transport>(
    transport: &T,
    batch: &mut Vec<Vec<u8>>,
    config: &ChannelConfig,
    stats: &ChannelStats,
) {
    if batch.is_empty() {
        return;
    }

    let mut backoff = config.retry_backoff;
    let max_backoff = Duration::from_secs(10);
    let mut attempt = 0;

    loop {
        match transport.send(batch).await {
            Ok(()) => {
                stats.delivered.fetch_add(batch.len() as u64, Ordering::Relaxed);
                break;
            }
            Err(e) if attempt >= config.max_retries => {
                stats.failed.fetch_add(batch.len() as u64, Ordering::Relaxed);
                eprintln!(
                    "dropping {} log records after {} attempts: {}",
                    batch.len(),
                    attempt + 1,
                    e
                );
                break;
            }
            Err(e) => {
                eprintln!("log transport send failed, retrying in {:?}: {}", backoff, e);
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
                attempt += 1;
            }
        }
    }

    batch.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::error::Error;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Recording {
        batches: Mutex<Vec<Vec<Vec<u8>>>>,
        closed: AtomicBool,
    }

    #[async_trait]
    impl Transport for Recording {
        async fn send(&self, batch: &[Vec<u8>]) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.batches.lock().unwrap().push(batch.to_vec());
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Unreachable {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _batch: &[Vec<u8>]) -> Result<(), Box<dyn Error + Send + Sync>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err("connection refused".into())
        }
    }

    #[test]
    fn initialize_needs_a_runtime() {
        let sink = ChannelSink::new("chan", Recording::default(), ChannelConfig::default());
        assert!(matches!(sink.initialize(), Err(SinkError::NoRuntime)));
        assert!(matches!(sink.write(b"x\n"), Err(SinkError::NotInitialized)));
    }

    #[tokio::test]
    async fn batches_are_delivered_and_drained_on_shutdown() {
        let config = ChannelConfig {
            batch_size: 2,
            flush_interval: Duration::from_secs(60),
            ..ChannelConfig::default()
        };
        let sink = ChannelSink::new("chan", Recording::default(), config);
        sink.initialize().unwrap();

        for line in [&b"a\n"[..], &b"b\n"[..], &b"c\n"[..]] {
            sink.write(line).unwrap();
        }
        sink.shutdown().await;

        let batches = sink.transport().batches.lock().unwrap().clone();
        assert_eq!(batches, vec![vec![b"a\n".to_vec(), b"b\n".to_vec()], vec![b"c\n".to_vec()]]);
        assert!(sink.transport().closed.load(Ordering::SeqCst));
        assert_eq!(sink.stats().delivered.load(Ordering::Relaxed), 3);
        assert!(matches!(sink.write(b"d\n"), Err(SinkError::Closed)));
    }

    #[tokio::test]
    async fn full_channel_drops_newest() {
        let config = ChannelConfig {
            buffer: 16,
            ..ChannelConfig::default()
        };
        let sink = ChannelSink::new("chan", Recording::default(), config);
        sink.initialize().unwrap();

        // The worker cannot run until this task yields, so the channel
        // fills deterministically.
        let results: Vec<_> = (0..20).map(|_| sink.write(b"x\n")).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 16);
        assert!(matches!(results[19], Err(SinkError::Full)));
        assert_eq!(sink.stats().dropped.load(Ordering::Relaxed), 4);

        sink.shutdown().await;
        assert_eq!(sink.stats().delivered.load(Ordering::Relaxed), 16);
    }

    #[tokio::test]
    async fn failing_batches_are_dropped_after_retries() {
        let config = ChannelConfig {
            batch_size: 1,
            max_retries: 2,
            retry_backoff: Duration::from_millis(1),
            ..ChannelConfig::default()
        };
        let sink = ChannelSink::new("chan", Unreachable::default(), config);
        sink.initialize().unwrap();

        sink.write(b"lost\n").unwrap();
        sink.shutdown().await;

        assert_eq!(sink.transport().attempts.load(Ordering::SeqCst), 3);
        assert_eq!(sink.stats().failed.load(Ordering::Relaxed), 1);
        assert_eq!(sink.stats().delivered.load(Ordering::Relaxed), 0);
    }
}
