use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use async_trait::async_trait;
use tracing_cloud_logging::batch::{BatchConfig, BatchingSink, Transport};
use tracing_cloud_logging::init::init_tracing_with_config;
use tracing_cloud_logging::{Config, SinkEntry};
use tokio::time::Duration;

/// Transport that accepts every batch without doing any I/O.
struct DiscardTransport;

#[async_trait]
impl Transport for DiscardTransport {
    async fn send(&self, _entries: &[SinkEntry]) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}

fn main() {
    let batch_config = BatchConfig {
        channel_buffer: 50_000,
        batch_size: 1_000,
        flush_interval: Duration::from_millis(200),
        flush_timeout: Duration::from_secs(5),
    };
    let sink = Arc::new(
        BatchingSink::spawn(Arc::new(DiscardTransport), batch_config).expect("start batching sink"),
    );
    let dropped = Arc::clone(&sink.dropped_entries);

    let config = Config::production().with_stacktrace_level(None);
    let core = init_tracing_with_config(sink, config, false).expect("install global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        if i % 10 == 0 {
            error!(iteration = i, "custom load test error");
        } else {
            info!(iteration = i, "custom load test info");
        }
    }

    let elapsed = start.elapsed();
    println!("custom config: sent {} events in {:?} (~{:.0} ev/s), dropped {}",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64(),
        dropped.load(std::sync::atomic::Ordering::Relaxed)
    );

    core.sync().expect("flush sink");
}
