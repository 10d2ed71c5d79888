use std::fmt;
use std::str::FromStr;

/// Abstract, ordered importance of a log record.
///
/// Levels are compared only by their ordinal. The three critical tiers sit
/// above [`Level::ERROR`]:
///
/// - [`Level::CRITICAL`]: a recoverable internal invariant was violated.
/// - [`Level::PANIC`]: the caller is about to unwind.
/// - [`Level::FATAL`]: the caller is about to terminate the process.
///
/// [`Level::INVALID`] is a sentinel that no parser or conversion in this
/// crate ever produces. Encoding a record at that level is a programming
/// error and panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(i8);

impl Level {
    pub const DEBUG: Level = Level(-1);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(1);
    pub const ERROR: Level = Level(2);
    pub const CRITICAL: Level = Level(3);
    pub const PANIC: Level = Level(4);
    pub const FATAL: Level = Level(5);
    pub const INVALID: Level = Level(6);

    /// Every level a caller may legitimately log at, lowest first.
    pub const ALL: [Level; 7] = [
        Level::DEBUG,
        Level::INFO,
        Level::WARN,
        Level::ERROR,
        Level::CRITICAL,
        Level::PANIC,
        Level::FATAL,
    ];

    /// Build a level from a raw ordinal. Values outside the known range are
    /// accepted and treated as unknown levels downstream.
    pub const fn new(ordinal: i8) -> Self {
        Level(ordinal)
    }

    pub const fn ordinal(self) -> i8 {
        self.0
    }

    /// True above [`Level::ERROR`]: the three critical tiers, and any
    /// unknown ordinal past them. Records at these levels are flushed
    /// before the write returns.
    pub fn is_critical(self) -> bool {
        self > Level::ERROR
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
            Level::CRITICAL => "critical",
            Level::PANIC => "panic",
            Level::FATAL => "fatal",
            Level::INVALID => "invalid",
            Level(other) => return write!(f, "Level({})", other),
        };
        f.write_str(name)
    }
}

/// Error returned when a string does not name a known level.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized log level `{0}`")]
pub struct ParseLevelError(pub String);

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" | "warning" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            "critical" | "dpanic" => Ok(Level::CRITICAL),
            "panic" | "alert" => Ok(Level::PANIC),
            "fatal" | "emergency" => Ok(Level::FATAL),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Level::DEBUG,
            tracing::Level::INFO => Level::INFO,
            tracing::Level::WARN => Level::WARN,
            tracing::Level::ERROR => Level::ERROR,
        }
    }
}
