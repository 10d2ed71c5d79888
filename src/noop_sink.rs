use crate::error::SinkError;
use crate::sink::{LogSink, SinkEntry};

/// A sink that simply drops all entries.
///
/// Useful for measuring the overhead of the encoder and layer without any
/// external I/O, and for tests that don't care about delivery.
#[derive(Clone, Default)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn enqueue(&self, _entry: SinkEntry) -> Result<(), SinkError> {
        Ok(())
    }
}
