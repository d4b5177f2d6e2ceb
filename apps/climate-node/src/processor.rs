use crate::record::ResultRecord;
use crate::sample::{Metric, SensorSample};
use crate::store::Store;
use crate::thresholds::Thresholds;
use chrono::Utc;

/// Turns one sample into one record per metric and appends each to the store.
#[derive(Debug, Clone)]
pub struct ReadingProcessor {
    thresholds: Thresholds,
    store: Store,
    node_id: String,
}

impl ReadingProcessor {
    pub fn new(thresholds: Thresholds, store: Store, node_id: impl Into<String>) -> Self {
        Self {
            thresholds,
            store,
            node_id: node_id.into(),
        }
    }

    /// Evaluate without persisting. All records share one timestamp.
    pub fn evaluate(&self, sample: &SensorSample) -> Vec<ResultRecord> {
        let now = Utc::now();
        Metric::ALL
            .iter()
            .map(|&metric| {
                let value = sample.get(metric);
                let status = match metric {
                    Metric::Temperature => self.thresholds.temperature.evaluate(value),
                    Metric::Humidity => self.thresholds.humidity.evaluate(value),
                };
                ResultRecord::evaluated(now, metric, value, status, self.node_id.clone())
            })
            .collect()
    }

    /// A failed append is logged and does not stop the sibling metric.
    pub fn process(&self, sample: &SensorSample) -> Vec<ResultRecord> {
        let records = self.evaluate(sample);
        for record in &records {
            tracing::info!(
                node_id = %record.node_id,
                "{} | {}: {} -> {}",
                crate::time::format_timestamp(&record.timestamp),
                record.sensor,
                record
                    .value
                    .map(|v| format!("{v:.1}"))
                    .unwrap_or_else(|| "none".to_string()),
                record.status,
            );
            if let Err(err) = self.store.append(record) {
                tracing::error!(error = %err, sensor = %record.sensor, "failed to store result");
            }
        }
        records
    }
}
