use crate::level::Level;
use serde::Serialize;
use std::fmt;

/// Native severity vocabulary of the log ingestion service.
///
/// The numeric values match the service's `LogSeverity` enumeration and the
/// serialized form is the upper-case name it expects on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    #[default]
    Default = 0,
    Debug = 100,
    Info = 200,
    Notice = 300,
    Warning = 400,
    Error = 500,
    Critical = 600,
    Alert = 700,
    Emergency = 800,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Default => "DEFAULT",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Alert => "ALERT",
            Severity::Emergency => "EMERGENCY",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy translating a [`Level`] into the sink's [`Severity`].
///
/// Implementations must be total: every `Level`, including unknown ordinals
/// and [`Level::INVALID`], maps to some severity. Any
/// `Fn(Level) -> Severity` closure is a valid strategy, which keeps tests
/// and alternative sink vocabularies cheap to plug in.
pub trait LevelToSeverity: Send + Sync {
    fn to_severity(&self, level: Level) -> Severity;
}

impl<F> LevelToSeverity for F
where
    F: Fn(Level) -> Severity + Send + Sync,
{
    fn to_severity(&self, level: Level) -> Severity {
        self(level)
    }
}

/// The stock mapping. All three critical tiers collapse onto
/// [`Severity::Critical`]; the encoder's textual tag still tells them apart.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSeverityMapper;

impl LevelToSeverity for DefaultSeverityMapper {
    fn to_severity(&self, level: Level) -> Severity {
        to_severity(level)
    }
}

pub fn to_severity(level: Level) -> Severity {
    match level {
        Level::DEBUG => Severity::Debug,
        Level::INFO => Severity::Info,
        Level::WARN => Severity::Warning,
        Level::ERROR => Severity::Error,
        Level::CRITICAL | Level::PANIC | Level::FATAL => Severity::Critical,
        _ => Severity::Default,
    }
}
