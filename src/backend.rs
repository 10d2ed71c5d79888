use crate::config::Config;
use crate::encoder::Encoder;
use crate::error::{EncodeError, SinkError, WriteError};
use crate::field::Field;
use crate::level::Level;
use crate::record::Record;
use crate::severity::LevelToSeverity;
use crate::sink::{LogSink, SinkEntry};
use std::fmt;
use std::sync::Arc;

/// Backend for a logging front-end: gates records by level, encodes them
/// and hands them to a [`LogSink`].
///
/// A `Core` is never mutated after construction. [`Core::with_fields`]
/// returns an independent copy that shares the sink and the severity
/// mapping but owns its own sticky fields. Writes only read `self`, so a
/// single core (or an `Arc` of it) can be written to from many threads.
#[derive(Clone)]
pub struct Core {
    sink: Arc<dyn LogSink>,
    encoder: Encoder,
    level: Level,
    level_to_severity: Arc<dyn LevelToSeverity>,
}

impl Core {
    pub fn new(sink: Arc<dyn LogSink>, config: &Config) -> Self {
        Self {
            sink,
            encoder: Encoder::new(config.encoder.clone()),
            level: config.level,
            level_to_severity: Arc::clone(&config.level_to_severity),
        }
    }

    /// Minimum level this core lets through.
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    /// Derive a core that attaches `fields` to every record it writes.
    ///
    /// `self` is left untouched.
    pub fn with_fields(&self, fields: &[Field]) -> Result<Core, EncodeError> {
        let mut derived = self.clone();
        derived.encoder.add_fields(fields)?;
        Ok(derived)
    }

    /// Gate `record` by level. A record below the minimum is dropped
    /// without touching the encoder or the sink.
    pub fn check(&self, record: Record) -> Option<CheckedRecord<'_>> {
        if self.enabled(record.level) {
            Some(CheckedRecord { core: self, record })
        } else {
            None
        }
    }

    /// Encode `record` together with the sticky fields and `fields`, and
    /// enqueue it on the sink.
    ///
    /// Critical records (see [`Level::is_critical`]) are flushed before
    /// returning, since the caller may be about to unwind or exit. Encode failures return
    /// before the sink is contacted; sink failures are returned as is.
    pub fn write(&self, record: &Record, fields: &[Field]) -> Result<(), WriteError> {
        let payload = self.encoder.encode(record, fields)?;

        let entry = SinkEntry {
            timestamp: record.time,
            severity: self.level_to_severity.to_severity(record.level),
            payload,
        };
        self.sink.enqueue(entry)?;

        if record.level.is_critical() {
            self.sync()?;
        }
        Ok(())
    }

    /// Flush the sink.
    pub fn sync(&self) -> Result<(), SinkError> {
        self.sink.flush()
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("level", &self.level)
            .field("encoder", &self.encoder)
            .finish_non_exhaustive()
    }
}

/// A record that passed [`Core::check`] and can now be written.
#[derive(Debug)]
pub struct CheckedRecord<'a> {
    core: &'a Core,
    record: Record,
}

impl<'a> CheckedRecord<'a> {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn write(self, fields: &[Field]) -> Result<(), WriteError> {
        self.core.write(&self.record, fields)
    }
}
