use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Temperature,
    Humidity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Temperature, Metric::Humidity];

    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(Metric::Temperature),
            "humidity" => Ok(Metric::Humidity),
            other => Err(format!("unknown metric {other}")),
        }
    }
}

/// What the sensor collaborator hands back, before normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawReading {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl RawReading {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature: Some(temperature),
            humidity: Some(humidity),
        }
    }

    pub fn unreadable() -> Self {
        Self::default()
    }
}

/// One (temperature, humidity) pair read at one instant. `None` means the
/// sensor could not produce a usable value for that metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl SensorSample {
    pub fn new(temperature: Option<f64>, humidity: Option<f64>) -> Self {
        Self {
            temperature: normalize(temperature),
            humidity: normalize(humidity),
        }
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
        }
    }
}

impl From<RawReading> for SensorSample {
    fn from(raw: RawReading) -> Self {
        SensorSample::new(raw.temperature, raw.humidity)
    }
}

fn normalize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}
