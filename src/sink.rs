use crate::error::SinkError;
use crate::severity::Severity;
use chrono::{DateTime, Utc};

/// One encoded record, ready for the ingestion service.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkEntry {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// Encoded payload, including the configured line ending.
    pub payload: Vec<u8>,
}

/// Destination for [`SinkEntry`]s produced by the record core.
///
/// Implementations are expected to buffer internally and must be safe to
/// call from many application threads at once. The core never retries, so
/// any retry policy belongs to the implementation's own transport.
pub trait LogSink: Send + Sync {
    /// Hand a single entry to the sink.
    ///
    /// **Parameters**
    /// - `entry`: fully-encoded [`SinkEntry`] produced by the core.
    ///
    /// **Returns**
    /// - `Ok(())` if the entry was accepted into the sink's buffer.
    /// - `Err(..)` if the sink could not accept it (queue full, closed).
    ///
    /// This is called on the application thread for every record that
    /// passes the level gate, so it should not block.
    fn enqueue(&self, entry: SinkEntry) -> Result<(), SinkError>;

    /// Push every entry accepted so far to the backend and wait for it.
    ///
    /// **Returns**
    /// - `Ok(())` once buffered entries were handed off.
    /// - `Err(..)` if the backend reported an error during flush.
    ///
    /// Default implementation is a no-op.
    fn flush(&self) -> Result<(), SinkError> {
        Ok(())
    }
}
