#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::error::Error;
use std::sync::Mutex;
use std::time::Duration;
use tracing_cloud_logging::batch::Transport;
use tracing_cloud_logging::{LogSink, SinkEntry, SinkError};

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Enqueue(SinkEntry),
    Flush,
}

/// Sink that records every call made to it.
#[derive(Default)]
pub struct SpySink {
    calls: Mutex<Vec<SinkCall>>,
    pub fail_enqueue: bool,
    pub fail_flush: bool,
}

impl SpySink {
    pub fn failing_enqueue() -> Self {
        Self {
            fail_enqueue: true,
            ..Self::default()
        }
    }

    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn entries(&self) -> Vec<SinkEntry> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                SinkCall::Enqueue(entry) => Some(entry),
                SinkCall::Flush => None,
            })
            .collect()
    }

    pub fn payloads(&self) -> Vec<Map<String, Value>> {
        self.entries().iter().map(|e| payload(e)).collect()
    }

    pub fn flushes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, SinkCall::Flush))
            .count()
    }
}

impl LogSink for SpySink {
    fn enqueue(&self, entry: SinkEntry) -> Result<(), SinkError> {
        if self.fail_enqueue {
            return Err(SinkError::QueueFull);
        }
        self.calls.lock().unwrap().push(SinkCall::Enqueue(entry));
        Ok(())
    }

    fn flush(&self) -> Result<(), SinkError> {
        self.calls.lock().unwrap().push(SinkCall::Flush);
        if self.fail_flush {
            return Err(SinkError::Transport("backend unavailable".into()));
        }
        Ok(())
    }
}

pub fn payload(entry: &SinkEntry) -> Map<String, Value> {
    match serde_json::from_slice(&entry.payload).expect("payload is JSON") {
        Value::Object(map) => map,
        other => panic!("payload is not an object: {other}"),
    }
}

/// Transport that keeps every batch it was given.
#[derive(Default)]
pub struct SpyTransport {
    batches: Mutex<Vec<Vec<SinkEntry>>>,
    pub fail: bool,
    pub delay: Option<Duration>,
}

impl SpyTransport {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<SinkEntry>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn delivered(&self) -> usize {
        self.batches().iter().map(Vec::len).sum()
    }
}

#[async_trait]
impl Transport for SpyTransport {
    async fn send(&self, entries: &[SinkEntry]) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err("ingestion endpoint returned 503".into());
        }
        self.batches.lock().unwrap().push(entries.to_vec());
        Ok(())
    }
}
