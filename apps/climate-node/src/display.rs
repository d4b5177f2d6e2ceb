use crate::sample::{Metric, SensorSample};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Temperature,
    Humidity,
}

impl DisplayMode {
    pub fn metric(self) -> Metric {
        match self {
            DisplayMode::Temperature => Metric::Temperature,
            DisplayMode::Humidity => Metric::Humidity,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DisplayMode::Temperature => 0,
            DisplayMode::Humidity => 1,
        }
    }

    fn from_u8(raw: u8) -> Self {
        if raw == 1 {
            DisplayMode::Humidity
        } else {
            DisplayMode::Temperature
        }
    }
}

/// Something that can render one value. Absent values render as an error
/// marker.
pub trait Display: Send + Sync {
    fn update(&self, mode: DisplayMode, value: Option<f64>);
    fn clear(&self);
}

/// Renders to the log; used when no panel is attached but a display is wanted.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl Display for LogDisplay {
    fn update(&self, mode: DisplayMode, value: Option<f64>) {
        tracing::info!(mode = ?mode, "display: {}", render_text(mode, value));
    }

    fn clear(&self) {
        tracing::debug!("display cleared");
    }
}

pub fn render_text(mode: DisplayMode, value: Option<f64>) -> String {
    match (mode, value) {
        (DisplayMode::Temperature, Some(v)) => format!("{v:.1}C"),
        (DisplayMode::Humidity, Some(v)) => format!("{v:.1}%"),
        (_, None) => "ERR".to_string(),
    }
}

/// Single-slot holder for the most recent sample, shared between the sampler
/// callback and anything that needs to redraw.
#[derive(Debug, Clone, Default)]
pub struct LatestSample {
    slot: Arc<RwLock<Option<SensorSample>>>,
}

impl LatestSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sample: SensorSample) {
        match self.slot.write() {
            Ok(mut guard) => *guard = Some(sample),
            Err(poisoned) => *poisoned.into_inner() = Some(sample),
        }
    }

    pub fn get(&self) -> Option<SensorSample> {
        match self.slot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Owns the optional display and its current mode.
#[derive(Clone)]
pub struct DisplayController {
    display: Option<Arc<dyn Display>>,
    mode: Arc<AtomicU8>,
    latest: LatestSample,
}

impl DisplayController {
    pub fn new(display: Option<Arc<dyn Display>>, latest: LatestSample) -> Self {
        Self {
            display,
            mode: Arc::new(AtomicU8::new(DisplayMode::Temperature.as_u8())),
            latest,
        }
    }

    pub fn is_present(&self) -> bool {
        self.display.is_some()
    }

    pub fn mode(&self) -> DisplayMode {
        DisplayMode::from_u8(self.mode.load(Ordering::SeqCst))
    }

    /// Switch mode and redraw from the latest sample.
    pub fn set_mode(&self, mode: DisplayMode) {
        self.mode.store(mode.as_u8(), Ordering::SeqCst);
        self.refresh();
    }

    pub fn show(&self, sample: &SensorSample) {
        if let Some(display) = &self.display {
            let mode = self.mode();
            display.update(mode, sample.get(mode.metric()));
        }
    }

    pub fn refresh(&self) {
        let Some(display) = &self.display else {
            return;
        };
        let mode = self.mode();
        let value = self.latest.get().and_then(|sample| sample.get(mode.metric()));
        display.update(mode, value);
    }

    pub fn clear(&self) {
        if let Some(display) = &self.display {
            display.clear();
        }
    }
}
