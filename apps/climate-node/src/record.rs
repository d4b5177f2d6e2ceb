use crate::sample::Metric;
use crate::thresholds::EvaluationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const LOCAL_NODE_ID: &str = "host";
pub const UNKNOWN_NODE_ID: &str = "unknown";

/// Status as persisted. Locally produced records always carry an evaluated
/// status; ingested records may carry anything a remote node sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    Evaluated(EvaluationStatus),
    Unknown,
    Reported(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Evaluated(status) => status.as_str(),
            RecordStatus::Unknown => "UNKNOWN",
            RecordStatus::Reported(raw) => raw.as_str(),
        }
    }
}

impl From<EvaluationStatus> for RecordStatus {
    fn from(status: EvaluationStatus) -> Self {
        RecordStatus::Evaluated(status)
    }
}

impl From<String> for RecordStatus {
    fn from(raw: String) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("UNKNOWN") {
            return RecordStatus::Unknown;
        }
        match trimmed.parse::<EvaluationStatus>() {
            Ok(status) => RecordStatus::Evaluated(status),
            Err(()) => RecordStatus::Reported(trimmed.to_string()),
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted (timestamp, node, metric, value, status) tuple. Never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub timestamp: DateTime<Utc>,
    pub sensor: String,
    pub value: Option<f64>,
    pub status: RecordStatus,
    pub node_id: String,
}

impl ResultRecord {
    pub fn evaluated(
        timestamp: DateTime<Utc>,
        metric: Metric,
        value: Option<f64>,
        status: EvaluationStatus,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            sensor: metric.as_str().to_string(),
            value,
            status: status.into(),
            node_id: node_id.into(),
        }
    }

    pub fn metric(&self) -> Option<Metric> {
        self.sensor.parse().ok()
    }
}

/// Per-node, per-metric most recent record. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NodeLatestView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<ResultRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<ResultRecord>,
}

impl NodeLatestView {
    pub fn slot_mut(&mut self, metric: Metric) -> &mut Option<ResultRecord> {
        match metric {
            Metric::Temperature => &mut self.temperature,
            Metric::Humidity => &mut self.humidity,
        }
    }
}
