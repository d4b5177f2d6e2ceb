use crate::control::{ControlActions, EnvironmentController};
use crate::display::{DisplayController, LatestSample};
use crate::processor::ReadingProcessor;
use crate::record::ResultRecord;
use crate::reporter::{RemoteReporter, ReportPayload};
use crate::sample::SensorSample;
use crate::sampler::SampleCallback;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Which body shape a node sends upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    Sample,
    Records,
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sample" | "combined" => Ok(ReportMode::Sample),
            "records" | "processed" => Ok(ReportMode::Records),
            other => Err(format!("unknown report mode {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FanoutOutcome {
    pub records: Vec<ResultRecord>,
    pub actions: ControlActions,
}

/// Everything one sample is handed to, in order: the shared slot, the
/// processor, the controller, the display and finally the reporter.
#[derive(Clone)]
pub struct SampleFanout {
    latest: LatestSample,
    processor: ReadingProcessor,
    controller: EnvironmentController,
    display: DisplayController,
    reporter: Option<(RemoteReporter, ReportMode)>,
}

impl SampleFanout {
    pub fn new(
        latest: LatestSample,
        processor: ReadingProcessor,
        controller: EnvironmentController,
        display: DisplayController,
    ) -> Self {
        Self {
            latest,
            processor,
            controller,
            display,
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: RemoteReporter, mode: ReportMode) -> Self {
        self.reporter = Some((reporter, mode));
        self
    }

    pub fn handle(&self, sample: SensorSample) -> FanoutOutcome {
        self.latest.set(sample);
        let records = self.processor.process(&sample);
        let actions = self.controller.apply(&sample);
        self.display.show(&sample);

        if let Some((reporter, mode)) = &self.reporter {
            match mode {
                ReportMode::Sample => {
                    let timestamp = records
                        .first()
                        .map(|r| r.timestamp)
                        .unwrap_or_else(chrono::Utc::now);
                    reporter.send(ReportPayload::Sample { sample, timestamp });
                }
                ReportMode::Records => {
                    for record in &records {
                        reporter.send(ReportPayload::Record(record.clone()));
                    }
                }
            }
        }

        FanoutOutcome { records, actions }
    }

    pub fn into_callback(self) -> SampleCallback {
        Arc::new(move |sample| {
            self.handle(sample);
        })
    }
}
