use crate::sample::RawReading;
use rand::Rng;
use std::sync::Mutex;

/// Physical sensor acquisition. Implementations must not panic; an unreadable
/// sensor is reported through absent fields.
pub trait SensorSource: Send + Sync {
    fn name(&self) -> &str;
    fn read(&self) -> RawReading;
}

/// Stand-in used when no sensor hardware is attached.
#[derive(Debug, Clone)]
pub struct FixedSensor {
    reading: RawReading,
}

impl FixedSensor {
    pub fn new(reading: RawReading) -> Self {
        Self { reading }
    }
}

impl Default for FixedSensor {
    fn default() -> Self {
        Self::new(RawReading::new(22.0, 50.0))
    }
}

impl SensorSource for FixedSensor {
    fn name(&self) -> &str {
        "fixed"
    }

    fn read(&self) -> RawReading {
        self.reading
    }
}

/// Bounded random walk, for exercising thresholds and actuators on a bench.
#[derive(Debug)]
pub struct SimulatedSensor {
    state: Mutex<(f64, f64)>,
    temperature_span: (f64, f64),
    humidity_span: (f64, f64),
    max_step: f64,
}

impl SimulatedSensor {
    pub fn new(temperature_span: (f64, f64), humidity_span: (f64, f64)) -> Self {
        let start = (
            (temperature_span.0 + temperature_span.1) / 2.0,
            (humidity_span.0 + humidity_span.1) / 2.0,
        );
        Self {
            state: Mutex::new(start),
            temperature_span,
            humidity_span,
            max_step: 1.5,
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new((12.0, 38.0), (35.0, 90.0))
    }
}

impl SensorSource for SimulatedSensor {
    fn name(&self) -> &str {
        "simulated"
    }

    fn read(&self) -> RawReading {
        let Ok(mut state) = self.state.lock() else {
            return RawReading::unreadable();
        };
        let mut rng = rand::thread_rng();
        let step = self.max_step;
        state.0 = (state.0 + rng.gen_range(-step..=step))
            .clamp(self.temperature_span.0, self.temperature_span.1);
        state.1 = (state.1 + rng.gen_range(-step..=step))
            .clamp(self.humidity_span.0, self.humidity_span.1);
        RawReading::new(state.0, state.1)
    }
}
