use crate::record::{RecordStatus, ResultRecord, UNKNOWN_NODE_ID};
use crate::sample::Metric;
use crate::store::{Store, StoreError};
use crate::time::parse_timestamp;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("No data provided")]
    EmptyPayload,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A submission after shape discrimination. Processed-result fields are
/// checked first; the raw-combined shape is the fallback.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestPayload {
    Processed {
        node_id: String,
        sensor: String,
        value: Option<f64>,
        status: RecordStatus,
        timestamp: Option<DateTime<Utc>>,
    },
    Combined {
        node_id: String,
        readings: Vec<(Metric, Option<f64>, RecordStatus)>,
    },
    /// Non-empty but carries neither shape; accepted and stores nothing.
    Unrecognized { node_id: String },
}

impl IngestPayload {
    pub fn parse(body: &JsonValue) -> Result<Self, IngestError> {
        let fields = match body {
            JsonValue::Object(fields) if !fields.is_empty() => fields,
            _ => return Err(IngestError::EmptyPayload),
        };
        let node_id = node_id(fields);

        if fields.contains_key("sensor") && fields.contains_key("value") {
            let sensor = fields
                .get("sensor")
                .and_then(JsonValue::as_str)
                .map(|s| s.trim().to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".to_string());
            return Ok(IngestPayload::Processed {
                node_id,
                sensor,
                value: number(fields.get("value")),
                status: status(fields.get("status")),
                timestamp: fields
                    .get("timestamp")
                    .and_then(JsonValue::as_str)
                    .and_then(parse_timestamp),
            });
        }

        let readings: Vec<_> = Metric::ALL
            .iter()
            .filter_map(|&metric| {
                let value = fields.get(metric.as_str())?;
                let status_key = match metric {
                    Metric::Temperature => "temp_status",
                    Metric::Humidity => "humidity_status",
                };
                Some((metric, number(Some(value)), status(fields.get(status_key))))
            })
            .collect();
        if readings.is_empty() {
            return Ok(IngestPayload::Unrecognized { node_id });
        }
        Ok(IngestPayload::Combined { node_id, readings })
    }

    pub fn into_records(self, now: DateTime<Utc>) -> Vec<ResultRecord> {
        match self {
            IngestPayload::Processed {
                node_id,
                sensor,
                value,
                status,
                timestamp,
            } => vec![ResultRecord {
                timestamp: timestamp.unwrap_or(now),
                sensor,
                value,
                status,
                node_id,
            }],
            IngestPayload::Combined { node_id, readings } => readings
                .into_iter()
                .map(|(metric, value, status)| ResultRecord {
                    timestamp: now,
                    sensor: metric.as_str().to_string(),
                    value,
                    status,
                    node_id: node_id.clone(),
                })
                .collect(),
            IngestPayload::Unrecognized { .. } => Vec::new(),
        }
    }
}

/// Parse, normalize and append a remote submission.
pub fn ingest(store: &Store, body: &JsonValue) -> Result<Vec<ResultRecord>, IngestError> {
    let payload = IngestPayload::parse(body)?;
    if let IngestPayload::Unrecognized { node_id } = &payload {
        tracing::warn!(node_id = %node_id, "submission carries no known fields; nothing stored");
    }
    let records = payload.into_records(Utc::now());
    for record in &records {
        store.append(record)?;
    }
    if let Some(first) = records.first() {
        tracing::debug!(node_id = %first.node_id, count = records.len(), "remote submission stored");
    }
    Ok(records)
}

fn node_id(fields: &Map<String, JsonValue>) -> String {
    ["pi_id", "node_id"]
        .iter()
        .filter_map(|key| fields.get(*key))
        .find_map(|value| match value {
            JsonValue::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            JsonValue::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| UNKNOWN_NODE_ID.to_string())
}

fn number(value: Option<&JsonValue>) -> Option<f64> {
    let parsed = match value? {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn status(value: Option<&JsonValue>) -> RecordStatus {
    match value.and_then(JsonValue::as_str) {
        Some(raw) => RecordStatus::from(raw.to_string()),
        None => RecordStatus::Unknown,
    }
}
