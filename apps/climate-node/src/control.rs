use crate::bands::{classify_humidity, classify_temperature};
use crate::sample::SensorSample;
use crate::thresholds::{EvaluationStatus, Thresholds};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Binary on/off output. Driving an output into the state it is already in
/// is a legal no-op; the actuator is the source of truth for its state.
pub trait Actuator: Send + Sync {
    fn name(&self) -> &str;
    fn set(&self, on: bool) -> Result<()>;
    fn is_on(&self) -> Option<bool>;
}

/// In-process output used when GPIO is disabled.
#[derive(Debug)]
pub struct MemoryActuator {
    name: String,
    state: AtomicBool,
}

impl MemoryActuator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: AtomicBool::new(false),
        }
    }
}

impl Actuator for MemoryActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, on: bool) -> Result<()> {
        let previous = self.state.swap(on, Ordering::SeqCst);
        if previous != on {
            tracing::debug!(actuator = %self.name, on, "actuator switched");
        }
        Ok(())
    }

    fn is_on(&self) -> Option<bool> {
        Some(self.state.load(Ordering::SeqCst))
    }
}

/// Active-high output on the Linux sysfs GPIO interface.
#[derive(Debug)]
pub struct SysfsGpioActuator {
    name: String,
    pin: u8,
    value_path: PathBuf,
}

impl SysfsGpioActuator {
    pub fn open(name: impl Into<String>, pin: u8) -> Result<Self> {
        Self::open_at(name, pin, PathBuf::from("/sys/class/gpio"))
    }

    pub fn open_at(name: impl Into<String>, pin: u8, gpio_root: PathBuf) -> Result<Self> {
        let name = name.into();
        let pin_dir = gpio_root.join(format!("gpio{pin}"));
        if !pin_dir.exists() {
            fs::write(gpio_root.join("export"), pin.to_string())
                .with_context(|| format!("failed to export gpio{pin} for {name}"))?;
        }
        fs::write(pin_dir.join("direction"), "out")
            .with_context(|| format!("failed to set gpio{pin} direction"))?;
        let actuator = Self {
            name,
            pin,
            value_path: pin_dir.join("value"),
        };
        actuator.set(false)?;
        Ok(actuator)
    }
}

impl Actuator for SysfsGpioActuator {
    fn name(&self) -> &str {
        &self.name
    }

    fn set(&self, on: bool) -> Result<()> {
        fs::write(&self.value_path, if on { "1" } else { "0" })
            .with_context(|| format!("failed to write gpio{} ({})", self.pin, self.name))
    }

    fn is_on(&self) -> Option<bool> {
        fs::read_to_string(&self.value_path)
            .ok()
            .map(|raw| raw.trim() == "1")
    }
}

#[derive(Clone)]
pub struct Actuators {
    pub heater: Arc<dyn Actuator>,
    pub fan: Arc<dyn Actuator>,
    pub humidifier: Arc<dyn Actuator>,
    pub dehumidifier: Arc<dyn Actuator>,
}

impl Actuators {
    pub fn in_memory() -> Self {
        Self {
            heater: Arc::new(MemoryActuator::new("heater")),
            fan: Arc::new(MemoryActuator::new("fan")),
            humidifier: Arc::new(MemoryActuator::new("humidifier")),
            dehumidifier: Arc::new(MemoryActuator::new("dehumidifier")),
        }
    }

    /// Pins are BCM numbers in the order humidifier, dehumidifier, heater, fan.
    pub fn sysfs(pins: [u8; 4]) -> Result<Self> {
        let [humidifier, dehumidifier, heater, fan] = pins;
        Ok(Self {
            humidifier: Arc::new(SysfsGpioActuator::open("humidifier", humidifier)?),
            dehumidifier: Arc::new(SysfsGpioActuator::open("dehumidifier", dehumidifier)?),
            heater: Arc::new(SysfsGpioActuator::open("heater", heater)?),
            fan: Arc::new(SysfsGpioActuator::open("fan", fan)?),
        })
    }

    fn all(&self) -> [&Arc<dyn Actuator>; 4] {
        [&self.heater, &self.fan, &self.humidifier, &self.dehumidifier]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TemperatureAction {
    Invalid,
    Heating,
    Cooling,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HumidityAction {
    Invalid,
    Humidifying,
    Dehumidifying,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlActions {
    pub temperature_action: TemperatureAction,
    pub humidity_action: HumidityAction,
}

/// Maps evaluated statuses onto the four actuators. Holds no state of its
/// own between calls.
#[derive(Clone)]
pub struct EnvironmentController {
    thresholds: Thresholds,
    actuators: Actuators,
}

impl EnvironmentController {
    pub fn new(thresholds: Thresholds, actuators: Actuators) -> Self {
        Self {
            thresholds,
            actuators,
        }
    }

    pub fn actuators(&self) -> &Actuators {
        &self.actuators
    }

    pub fn apply(&self, sample: &SensorSample) -> ControlActions {
        let temperature_status = self.thresholds.temperature.evaluate(sample.temperature);
        let humidity_status = self.thresholds.humidity.evaluate(sample.humidity);

        let temperature_action = self.control_temperature(temperature_status);
        let humidity_action = self.control_humidity(humidity_status);

        tracing::info!(
            temperature_action = ?temperature_action,
            humidity_action = ?humidity_action,
            temperature_band = ?sample.temperature.map(classify_temperature),
            humidity_band = ?sample.humidity.map(classify_humidity),
            "environment control applied"
        );

        ControlActions {
            temperature_action,
            humidity_action,
        }
    }

    fn control_temperature(&self, status: EvaluationStatus) -> TemperatureAction {
        let (heater, fan, action) = match status {
            EvaluationStatus::Invalid => (false, false, TemperatureAction::Invalid),
            EvaluationStatus::Low => (true, false, TemperatureAction::Heating),
            EvaluationStatus::High => (false, true, TemperatureAction::Cooling),
            EvaluationStatus::Stable => (false, false, TemperatureAction::Stable),
        };
        // Switch the opposing output off first so both are never on together.
        if heater {
            drive(&self.actuators.fan, fan);
            drive(&self.actuators.heater, heater);
        } else {
            drive(&self.actuators.heater, heater);
            drive(&self.actuators.fan, fan);
        }
        action
    }

    fn control_humidity(&self, status: EvaluationStatus) -> HumidityAction {
        let (humidifier, dehumidifier, action) = match status {
            EvaluationStatus::Invalid => (false, false, HumidityAction::Invalid),
            EvaluationStatus::Low => (true, false, HumidityAction::Humidifying),
            EvaluationStatus::High => (false, true, HumidityAction::Dehumidifying),
            EvaluationStatus::Stable => (false, false, HumidityAction::Stable),
        };
        if humidifier {
            drive(&self.actuators.dehumidifier, dehumidifier);
            drive(&self.actuators.humidifier, humidifier);
        } else {
            drive(&self.actuators.humidifier, humidifier);
            drive(&self.actuators.dehumidifier, dehumidifier);
        }
        action
    }

    /// Drives every output off. Never fails; individual errors are logged.
    pub fn shutdown(&self) {
        for actuator in self.actuators.all() {
            drive(actuator, false);
        }
        tracing::info!("all actuators switched off");
    }
}

fn drive(actuator: &Arc<dyn Actuator>, on: bool) {
    if let Err(err) = actuator.set(on) {
        tracing::warn!(actuator = %actuator.name(), on, error = %err, "actuator command failed");
    }
}
