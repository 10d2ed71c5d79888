use crate::level::Level;
use chrono::{DateTime, Utc};
use std::panic::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Caller { file: file.into(), line }
    }

    /// Location of whoever called this function.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Caller::new(location.file(), location.line())
    }
}

/// One log call, created by the front-end and consumed by a single write.
#[derive(Debug, Clone)]
pub struct Record {
    pub time: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub caller: Option<Caller>,
    pub stack: Option<String>,
}

impl Record {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Record {
            time: Utc::now(),
            level,
            message: message.into(),
            caller: None,
            stack: None,
        }
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}
