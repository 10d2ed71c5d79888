use crate::error::SinkError;
use crate::sink::{LogSink, SinkEntry};
use async_trait::async_trait;
use std::error::Error;
use std::sync::mpsc as std_mpsc;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Asynchronous delivery of batches of [`SinkEntry`]s to a backend.
///
/// Implementations are called from the [`BatchingSink`] worker thread,
/// never from the application thread.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a batch to the backend.
    ///
    /// **Parameters**
    /// - `entries`: non-empty batch in enqueue order.
    ///
    /// **Returns**
    /// - `Ok(())` if the backend accepted the batch.
    /// - `Err(..)` on network errors, serialization errors, HTTP status,
    ///   etc. The batch is not retried.
    async fn send(&self, entries: &[SinkEntry]) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Buffering and batching knobs of a [`BatchingSink`].
///
/// **Fields**
/// - `channel_buffer`: maximum number of queued entries before `enqueue`
///   starts failing with [`SinkError::QueueFull`].
/// - `batch_size`: number of entries that triggers an immediate send.
/// - `flush_interval`: maximum time an entry waits before being sent,
///   even when the batch is not full.
/// - `flush_timeout`: how long [`LogSink::flush`] waits for the worker.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub flush_timeout: Duration,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            flush_timeout: Duration::from_secs(5),
        }
    }
}

type FlushAck = std_mpsc::SyncSender<Result<(), SinkError>>;

/// [`LogSink`] that queues entries in a bounded channel and ships them in
/// batches through a [`Transport`].
///
/// The worker runs on its own thread with its own Tokio runtime, so
/// `enqueue` and `flush` work the same from plain threads and from inside
/// any async runtime.
///
/// Dropping the sink sends whatever is still queued and stops the worker.
/// The drop blocks until the worker has exited, for at most
/// `flush_timeout`; entries still in flight after that are lost.
pub struct BatchingSink {
    entries: mpsc::Sender<SinkEntry>,
    flushes: mpsc::UnboundedSender<FlushAck>,
    shutdown: Option<oneshot::Sender<()>>,
    /// Disconnects when the worker thread exits.
    finished: Mutex<std_mpsc::Receiver<()>>,
    flush_timeout: Duration,
    /// Entries accepted into the queue.
    pub enqueued_entries: Arc<AtomicU64>,
    /// Entries rejected because the queue was full.
    pub dropped_entries: Arc<AtomicU64>,
    /// Background sends that failed outside of an explicit flush.
    pub failed_batches: Arc<AtomicU64>,
}

impl BatchingSink {
    /// Start the worker thread and return the sink feeding it.
    ///
    /// Minimal thresholds are enforced for `channel_buffer`, `batch_size`
    /// and `flush_interval` to avoid degenerate configurations.
    ///
    /// **Returns**
    /// - `Err(..)` if the worker runtime or thread could not be created.
    pub fn spawn(transport: Arc<dyn Transport>, config: BatchConfig) -> std::io::Result<Self> {
        let buffer = config.channel_buffer.max(16);
        let batch_size = config.batch_size.max(1);
        let flush_interval = config.flush_interval.max(Duration::from_millis(10));

        let (tx, rx) = mpsc::channel::<SinkEntry>(buffer);
        let (flush_tx, flush_rx) = mpsc::unbounded_channel::<FlushAck>();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (finished_tx, finished_rx) = std_mpsc::channel::<()>();

        let failed_batches = Arc::new(AtomicU64::new(0));
        let worker = Worker {
            transport,
            batch_size,
            flush_interval,
            failed_batches: Arc::clone(&failed_batches),
        };

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        thread::Builder::new()
            .name("cloud-logging-batcher".to_string())
            .spawn(move || {
                let _finished = finished_tx;
                runtime.block_on(worker.run(rx, flush_rx, shutdown_rx));
            })?;

        Ok(Self {
            entries: tx,
            flushes: flush_tx,
            shutdown: Some(shutdown_tx),
            finished: Mutex::new(finished_rx),
            flush_timeout: config.flush_timeout,
            enqueued_entries: Arc::new(AtomicU64::new(0)),
            dropped_entries: Arc::new(AtomicU64::new(0)),
            failed_batches,
        })
    }
}

impl LogSink for BatchingSink {
    fn enqueue(&self, entry: SinkEntry) -> Result<(), SinkError> {
        match self.entries.try_send(entry) {
            Ok(()) => {
                self.enqueued_entries.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped_entries.fetch_add(1, Ordering::Relaxed);
                Err(SinkError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SinkError::Closed),
        }
    }

    fn flush(&self) -> Result<(), SinkError> {
        let (ack_tx, ack_rx) = std_mpsc::sync_channel(1);
        self.flushes.send(ack_tx).map_err(|_| SinkError::Closed)?;
        match ack_rx.recv_timeout(self.flush_timeout) {
            Ok(result) => result,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                Err(SinkError::FlushTimeout(self.flush_timeout))
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => Err(SinkError::Closed),
        }
    }
}

impl Drop for BatchingSink {
    fn drop(&mut self) {
        drop(self.shutdown.take());
        let finished = self
            .finished
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        let waited = finished.recv_timeout(self.flush_timeout);
        if let Err(std_mpsc::RecvTimeoutError::Timeout) = waited {
            eprintln!(
                "log batch worker still running after {:?}; remaining entries may be lost",
                self.flush_timeout
            );
        }
    }
}

struct Worker {
    transport: Arc<dyn Transport>,
    batch_size: usize,
    flush_interval: Duration,
    failed_batches: Arc<AtomicU64>,
}

impl Worker {
    async fn run(
        self,
        mut rx: mpsc::Receiver<SinkEntry>,
        mut flush_rx: mpsc::UnboundedReceiver<FlushAck>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                Some(ack) = flush_rx.recv() => {
                    // Everything enqueued before the flush request is
                    // already in the channel.
                    while let Ok(entry) = rx.try_recv() {
                        batch.push(entry);
                    }
                    let result = self.send(&mut batch).await;
                    let _ = ack.send(result);
                }
                maybe_entry = rx.recv() => match maybe_entry {
                    Some(entry) => {
                        batch.push(entry);
                        if batch.len() >= self.batch_size {
                            self.send_in_background(&mut batch, "error sending log batch").await;
                        }
                    }
                    None => {
                        self.send_in_background(&mut batch, "error sending final log batch").await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    self.send_in_background(&mut batch, "error flushing log batch").await;
                }
                _ = &mut shutdown => {
                    while let Ok(entry) = rx.try_recv() {
                        batch.push(entry);
                    }
                    self.send_in_background(&mut batch, "error sending final log batch").await;
                    break;
                }
            }
        }
    }

    async fn send(&self, batch: &mut Vec<SinkEntry>) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }
        let result = self.transport.send(&batch[..]).await;
        batch.clear();
        result.map_err(SinkError::Transport)
    }

    async fn send_in_background(&self, batch: &mut Vec<SinkEntry>, context: &str) {
        if let Err(e) = self.send(batch).await {
            self.failed_batches.fetch_add(1, Ordering::Relaxed);
            eprintln!("{}: {}", context, e);
        }
    }
}
