use crate::sample::SensorSample;
use crate::sensor::SensorSource;
use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub type SampleCallback = Arc<dyn Fn(SensorSample) + Send + Sync>;

/// Fixed-interval polling loop. Polls never overlap: the read and the
/// callback for one interval finish before the next sleep starts.
pub struct SensorSampler {
    interval: Duration,
    sensor: Arc<dyn SensorSource>,
    callback: Option<SampleCallback>,
}

impl SensorSampler {
    pub fn new(interval: Duration, sensor: Arc<dyn SensorSource>) -> Result<Self> {
        if interval.is_zero() {
            return Err(anyhow!("sampling interval must be greater than zero"));
        }
        Ok(Self {
            interval,
            sensor,
            callback: None,
        })
    }

    pub fn with_callback(mut self, callback: SampleCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    /// Spawn the loop. It exits once `cancel` fires, at the next sleep or
    /// before the next poll.
    pub fn start(self, cancel: CancellationToken) -> SamplerHandle {
        let polls = Arc::new(AtomicU64::new(0));
        let task_polls = polls.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            tracing::info!(
                sensor = %self.sensor.name(),
                interval_secs = self.interval.as_secs_f64(),
                "sensor sampler started"
            );
            loop {
                if task_cancel.is_cancelled() {
                    break;
                }
                if let Err(err) = self.poll_once().await {
                    tracing::error!(error = %err, "sensor poll failed");
                }
                task_polls.fetch_add(1, Ordering::Relaxed);

                tokio::select! {
                    _ = task_cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
            tracing::info!("sensor sampler stopped");
        });
        SamplerHandle { cancel, task, polls }
    }

    async fn poll_once(&self) -> Result<()> {
        let sensor = self.sensor.clone();
        let callback = self.callback.clone();
        // Sensor reads and the fan-out are synchronous I/O.
        tokio::task::spawn_blocking(move || {
            let sample = SensorSample::from(sensor.read());
            if let Some(callback) = callback {
                callback(sample);
            }
        })
        .await
        .map_err(|err| anyhow!("poll task failed: {err}"))
    }
}

pub struct SamplerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    polls: Arc<AtomicU64>,
}

impl SamplerHandle {
    /// Cooperative stop; pair with [`SamplerHandle::join`].
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the loop has fully exited.
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|err| anyhow!("sampler task failed: {err}"))
    }
}
