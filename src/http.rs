use crate::batch::Transport;
use crate::env::{
    env_opt, env_or, CLOUD_LOGGING_ENDPOINT_ENV, CLOUD_LOGGING_LOG_ID_ENV,
    CLOUD_LOGGING_PROJECT_ENV, CLOUD_LOGGING_TOKEN_ENV,
};
use crate::severity::Severity;
use crate::sink::SinkEntry;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;

pub const DEFAULT_ENDPOINT: &str = "https://logging.googleapis.com/v2/entries:write";

/// Configuration for [`HttpTransport`].
///
/// The transport talks to the ingestion service's `entries:write` REST
/// endpoint, one request per batch.
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    /// Full URL of the `entries:write` endpoint.
    pub endpoint: String,
    pub project_id: String,
    /// Log id; URL-encoded into the log name.
    pub log_id: String,
    /// Monitored resource type, `global` unless running on a known platform.
    pub resource_type: String,
    pub resource_labels: BTreeMap<String, String>,
    /// Labels applied to every entry of every request.
    pub labels: BTreeMap<String, String>,
    pub bearer_token: Option<String>,
}

impl HttpTransportConfig {
    pub fn new(project_id: impl Into<String>, log_id: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: project_id.into(),
            log_id: log_id.into(),
            resource_type: "global".to_string(),
            resource_labels: BTreeMap::new(),
            labels: BTreeMap::new(),
            bearer_token: None,
        }
    }

    /// Build from `CLOUD_LOGGING_PROJECT`, `CLOUD_LOGGING_LOG_ID`,
    /// `CLOUD_LOGGING_ENDPOINT` and `CLOUD_LOGGING_TOKEN`.
    pub fn from_env() -> Self {
        let mut config = Self::new(
            env_or(CLOUD_LOGGING_PROJECT_ENV, ""),
            env_or(CLOUD_LOGGING_LOG_ID_ENV, "app"),
        );
        config.endpoint = env_or(CLOUD_LOGGING_ENDPOINT_ENV, DEFAULT_ENDPOINT);
        config.bearer_token = env_opt(CLOUD_LOGGING_TOKEN_ENV);
        config
    }

    /// `projects/{project}/logs/{log id}` with the log id URL-encoded.
    pub fn log_name(&self) -> String {
        format!(
            "projects/{}/logs/{}",
            self.project_id,
            urlencoding::encode(&self.log_id)
        )
    }
}

/// [`Transport`] that writes batches to the ingestion service over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn request<'a>(&'a self, entries: &'a [SinkEntry]) -> WriteRequest<'a> {
        WriteRequest {
            log_name: self.config.log_name(),
            resource: MonitoredResource {
                kind: &self.config.resource_type,
                labels: &self.config.resource_labels,
            },
            labels: &self.config.labels,
            entries: entries.iter().map(map_entry).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WriteRequest<'a> {
    log_name: String,
    resource: MonitoredResource<'a>,
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a BTreeMap<String, String>,
    entries: Vec<WireEntry>,
}

#[derive(Serialize)]
struct MonitoredResource<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    #[serde(skip_serializing_if = "no_labels")]
    labels: &'a BTreeMap<String, String>,
}

fn no_labels(labels: &&BTreeMap<String, String>) -> bool {
    labels.is_empty()
}

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
struct WireEntry {
    timestamp: String,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    json_payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_payload: Option<String>,
}

/// Payloads that parse as a JSON object travel as `jsonPayload` so the log
/// viewer can index their fields; anything else is sent as text.
fn map_entry(entry: &SinkEntry) -> WireEntry {
    let (json_payload, text_payload) = match serde_json::from_slice::<Value>(&entry.payload) {
        Ok(object @ Value::Object(_)) => (Some(object), None),
        _ => {
            let text = String::from_utf8_lossy(&entry.payload);
            (None, Some(text.trim_end_matches(['\r', '\n']).to_string()))
        }
    };
    WireEntry {
        timestamp: entry.timestamp.to_rfc3339(),
        severity: entry.severity,
        json_payload,
        text_payload,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, entries: &[SinkEntry]) -> Result<(), Box<dyn Error + Send + Sync>> {
        let body = serde_json::to_vec(&self.request(entries))?;
        let mut req = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(token) = &self.config.bearer_token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(format!("entries:write failed with status {}: {}", status, text).into())
        }
    }
}
