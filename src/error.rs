use std::error::Error;
use std::time::Duration;

/// A record could not be turned into a payload. The record is not sent.
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("field `{key}` could not be serialized: {reason}")]
    Unserializable { key: String, reason: String },

    #[error("failed to serialize payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// The sink refused or failed an enqueue or flush.
///
/// A record written before this error was returned may or may not have
/// reached the ingestion service.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("sink queue is full")]
    QueueFull,

    #[error("sink is closed")]
    Closed,

    #[error("flush did not complete within {0:?}")]
    FlushTimeout(Duration),

    #[error("transport failed: {0}")]
    Transport(#[source] Box<dyn Error + Send + Sync>),
}

/// Failure of a single `write`.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Error returned when building configuration from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("unknown preset `{0}`, expected `production` or `development`")]
    UnknownPreset(String),

    #[error(transparent)]
    Level(#[from] crate::level::ParseLevelError),
}
