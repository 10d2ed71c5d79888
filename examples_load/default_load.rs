use std::sync::Arc;
use std::time::Instant;
use tracing::error;

use tracing_cloud_logging::init::init_tracing;
use tracing_cloud_logging::noop_sink::NoopSink;

fn main() {
    let sink = Arc::new(NoopSink::default());
    let core = init_tracing(sink).expect("install global subscriber");

    let n: u64 = 100_000;
    let start = Instant::now();

    for i in 0..n {
        error!(iteration = i, "default load test error");
    }

    let elapsed = start.elapsed();
    println!("default config: encoded {} events in {:?} (~{:.0} ev/s)",
        n,
        elapsed,
        n as f64 / elapsed.as_secs_f64()
    );

    core.sync().expect("flush sink");
}
