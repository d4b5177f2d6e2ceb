use crate::record::ResultRecord;
use crate::sample::SensorSample;
use crate::thresholds::{EvaluationStatus, Thresholds};
use crate::time::format_timestamp;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("host answered {0}")]
    Status(StatusCode),
}

#[derive(Debug, Clone)]
pub enum ReportPayload {
    /// Raw-combined shape: both metrics plus their statuses in one body.
    Sample {
        sample: SensorSample,
        timestamp: DateTime<Utc>,
    },
    /// Processed shape: one evaluated record.
    Record(ResultRecord),
}

#[derive(Debug, Serialize)]
struct SampleBody<'a> {
    temperature: Option<f64>,
    humidity: Option<f64>,
    temp_status: EvaluationStatus,
    humidity_status: EvaluationStatus,
    pi_id: &'a str,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    timestamp: String,
    sensor: &'a str,
    value: Option<f64>,
    status: &'a str,
    pi_id: &'a str,
}

/// Best-effort delivery of node results to the host's ingestion endpoint.
/// At most once: failures are logged and dropped, never retried.
#[derive(Clone)]
pub struct RemoteReporter {
    client: Client,
    endpoint: String,
    node_id: String,
    thresholds: Thresholds,
    runtime: Handle,
}

impl RemoteReporter {
    pub fn new(
        host_url: &str,
        node_id: impl Into<String>,
        thresholds: Thresholds,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("climate-node/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build reporter http client")?;
        let runtime = Handle::try_current().context("reporter must be created inside a tokio runtime")?;
        Ok(Self {
            client,
            endpoint: format!("{}/remote-data", host_url.trim().trim_end_matches('/')),
            node_id: node_id.into(),
            thresholds,
            runtime,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn body(&self, payload: &ReportPayload) -> serde_json::Result<serde_json::Value> {
        match payload {
            ReportPayload::Sample { sample, timestamp } => serde_json::to_value(SampleBody {
                temperature: sample.temperature,
                humidity: sample.humidity,
                temp_status: self.thresholds.temperature.evaluate(sample.temperature),
                humidity_status: self.thresholds.humidity.evaluate(sample.humidity),
                pi_id: &self.node_id,
                timestamp: format_timestamp(timestamp),
            }),
            ReportPayload::Record(record) => serde_json::to_value(RecordBody {
                timestamp: format_timestamp(&record.timestamp),
                sensor: &record.sensor,
                value: record.value,
                status: record.status.as_str(),
                pi_id: &self.node_id,
            }),
        }
    }

    /// Fire-and-forget. The returned handle may be dropped.
    pub fn send(&self, payload: ReportPayload) -> JoinHandle<()> {
        let reporter = self.clone();
        self.runtime.spawn(async move {
            match reporter.deliver(&payload).await {
                Ok(()) => tracing::debug!(endpoint = %reporter.endpoint, "report delivered"),
                Err(err) => tracing::warn!(
                    endpoint = %reporter.endpoint,
                    node_id = %reporter.node_id,
                    error = %err,
                    "failed to send data to host; dropping"
                ),
            }
        })
    }

    pub async fn deliver(&self, payload: &ReportPayload) -> Result<(), NetworkError> {
        let body = match self.body(payload) {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode report payload");
                return Ok(());
            }
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status(status));
        }
        Ok(())
    }
}
