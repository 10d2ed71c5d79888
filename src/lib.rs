pub mod level;
pub mod severity;
pub mod field;
pub mod record;
pub mod encoder;
pub mod error;
pub mod sink;
pub mod backend;
pub mod config;
pub mod layer;
pub mod batch;

#[cfg(feature = "http")]
pub mod http;

pub mod env;
pub mod init;
pub mod noop_sink;

pub use crate::config::Config;
pub use crate::backend::{CheckedRecord, Core};
pub use crate::error::{ConfigError, EncodeError, SinkError, WriteError};
pub use crate::field::{Field, FieldValue};
pub use crate::layer::CloudLoggingLayer;
pub use crate::level::Level;
pub use crate::record::{Caller, Record};
pub use crate::severity::{LevelToSeverity, Severity};
pub use crate::sink::{LogSink, SinkEntry};
