use crate::node_id::derive_node_id;
use crate::pipeline::ReportMode;
use crate::record::LOCAL_NODE_ID;
use crate::thresholds::{ThresholdRange, Thresholds};
use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Role {
    /// Samples locally and also serves ingestion and aggregation over HTTP.
    Host,
    /// Samples locally and reports to a host.
    Client,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "host" => Ok(Role::Host),
            "client" | "node" => Ok(Role::Client),
            other => Err(format!("unknown role {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Fixed,
    Simulated,
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" | "fallback" => Ok(SensorKind::Fixed),
            "simulated" | "sim" => Ok(SensorKind::Simulated),
            other => Err(format!("unknown sensor kind {other}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub role: Role,
    pub node_id: String,
    pub thresholds: Thresholds,
    pub sample_interval: Duration,

    pub host_url: Option<String>,
    pub report_mode: ReportMode,
    pub report_timeout: Duration,

    pub db_path: PathBuf,
    pub history_limit_max: usize,

    pub sensor: SensorKind,
    pub gpio_enabled: bool,
    /// Humidifier, dehumidifier, heater, fan.
    pub gpio_pins: [u8; 4],
    pub display_enabled: bool,
}

impl Config {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env(role_override: Option<Role>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(role_override, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(role_override: Option<Role>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env { lookup };

        let role = match role_override {
            Some(role) => role,
            None => env.parse("CLIMATE_ROLE", Role::Host)?,
        };
        let node_id = match env.optional("CLIMATE_NODE_ID") {
            Some(id) => id,
            None if role == Role::Host => LOCAL_NODE_ID.to_string(),
            None => derive_node_id(),
        };

        let thresholds = Thresholds {
            temperature: env.range("TEMP_MIN", "TEMP_MAX", 18.0, 26.0)?,
            humidity: env.range("HUMIDITY_MIN", "HUMIDITY_MAX", 40.0, 70.0)?,
        };

        let interval_secs = env.u64("CLIMATE_SAMPLE_INTERVAL_SECONDS", 10)?;
        if interval_secs == 0 {
            bail!("CLIMATE_SAMPLE_INTERVAL_SECONDS must be greater than zero");
        }

        let host_url = env.optional("CLIMATE_HOST_URL");
        if let Some(url) = &host_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("invalid CLIMATE_HOST_URL: expected an http(s) URL, got {url}");
            }
        }
        let report_mode = env.parse("CLIMATE_REPORT_MODE", ReportMode::Sample)?;
        let report_timeout =
            Duration::from_secs(env.u64("CLIMATE_REPORT_TIMEOUT_SECONDS", 5)?.clamp(1, 10));

        let db_path = PathBuf::from(env.string("CLIMATE_DB_PATH", "data/sensor_data.db"));
        let history_limit_max = env.u64("CLIMATE_HISTORY_LIMIT_MAX", 10_000)?.max(1) as usize;

        let sensor = env.parse("CLIMATE_SENSOR", SensorKind::Fixed)?;
        let gpio_enabled = env.bool("CLIMATE_GPIO_ENABLED", false)?;
        let gpio_pins = env.pins("CLIMATE_GPIO_PINS", [17, 27, 22, 23])?;
        let display_enabled = env.bool("CLIMATE_DISPLAY_ENABLED", false)?;

        Ok(Self {
            role,
            node_id,
            thresholds,
            sample_interval: Duration::from_secs(interval_secs),
            host_url,
            report_mode,
            report_timeout,
            db_path,
            history_limit_max,
            sensor,
            gpio_enabled,
            gpio_pins,
            display_enabled,
        })
    }
}

struct Env<F> {
    lookup: F,
}

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn u64(&self, key: &str, default: u64) -> Result<u64> {
        match self.optional(key) {
            Some(raw) => raw.parse::<u64>().with_context(|| format!("invalid {key}")),
            None => Ok(default),
        }
    }

    fn f64(&self, key: &str, default: f64) -> Result<f64> {
        let value = match self.optional(key) {
            Some(raw) => raw.parse::<f64>().with_context(|| format!("invalid {key}"))?,
            None => default,
        };
        if !value.is_finite() {
            bail!("invalid {key}: must be a finite number");
        }
        Ok(value)
    }

    fn bool(&self, key: &str, default: bool) -> Result<bool> {
        match self.optional(key) {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(anyhow!("invalid {key}: expected true or false")),
            },
            None => Ok(default),
        }
    }

    fn parse<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr<Err = String>,
    {
        match self.optional(key) {
            Some(raw) => raw.parse::<T>().map_err(|err| anyhow!("invalid {key}: {err}")),
            None => Ok(default),
        }
    }

    fn range(&self, min_key: &str, max_key: &str, min: f64, max: f64) -> Result<ThresholdRange> {
        let min = self.f64(min_key, min)?;
        let max = self.f64(max_key, max)?;
        if min > max {
            bail!("{min_key} ({min}) must not exceed {max_key} ({max})");
        }
        Ok(ThresholdRange::new(min, max))
    }

    fn pins(&self, key: &str, default: [u8; 4]) -> Result<[u8; 4]> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        let pins = raw
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("invalid {key}"))?;
        <[u8; 4]>::try_from(pins)
            .map_err(|pins| anyhow!("invalid {key}: expected 4 pins, got {}", pins.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(None, move |key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_match_documented_values() {
        let config = config(&[]).unwrap();
        assert_eq!(config.role, Role::Host);
        assert_eq!(config.node_id, "host");
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.sample_interval, Duration::from_secs(10));
        assert_eq!(config.host_url, None);
        assert_eq!(config.report_mode, ReportMode::Sample);
        assert_eq!(config.report_timeout, Duration::from_secs(5));
        assert_eq!(config.db_path, PathBuf::from("data/sensor_data.db"));
        assert_eq!(config.history_limit_max, 10_000);
        assert_eq!(config.sensor, SensorKind::Fixed);
        assert!(!config.gpio_enabled);
        assert_eq!(config.gpio_pins, [17, 27, 22, 23]);
        assert!(!config.display_enabled);
    }

    #[test]
    fn thresholds_come_from_env() {
        let config = config(&[
            ("TEMP_MIN", "16.5"),
            ("TEMP_MAX", "24"),
            ("HUMIDITY_MIN", " 35 "),
            ("HUMIDITY_MAX", "60"),
        ])
        .unwrap();
        assert_eq!(config.thresholds.temperature, ThresholdRange::new(16.5, 24.0));
        assert_eq!(config.thresholds.humidity, ThresholdRange::new(35.0, 60.0));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = config(&[("TEMP_MIN", "30"), ("TEMP_MAX", "20")]).unwrap_err();
        assert!(err.to_string().contains("TEMP_MIN"));
    }

    #[test]
    fn unparsable_values_name_the_variable() {
        let err = config(&[("HUMIDITY_MAX", "wet")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid HUMIDITY_MAX");
        assert!(config(&[("TEMP_MIN", "NaN")]).is_err());
        assert!(config(&[("CLIMATE_SAMPLE_INTERVAL_SECONDS", "0")]).is_err());
        assert!(config(&[("CLIMATE_GPIO_ENABLED", "maybe")]).is_err());
        assert!(config(&[("CLIMATE_GPIO_PINS", "17,27")]).is_err());
        assert!(config(&[("CLIMATE_HOST_URL", "host:5000")]).is_err());
    }

    #[test]
    fn client_role_reports_to_host() {
        let config = config(&[
            ("CLIMATE_ROLE", "client"),
            ("CLIMATE_NODE_ID", "pi-12"),
            ("CLIMATE_HOST_URL", "http://192.168.1.10:5000"),
            ("CLIMATE_REPORT_MODE", "records"),
            ("CLIMATE_REPORT_TIMEOUT_SECONDS", "60"),
        ])
        .unwrap();
        assert_eq!(config.role, Role::Client);
        assert_eq!(config.node_id, "pi-12");
        assert_eq!(config.host_url.as_deref(), Some("http://192.168.1.10:5000"));
        assert_eq!(config.report_mode, ReportMode::Records);
        assert_eq!(config.report_timeout, Duration::from_secs(10));
    }

    #[test]
    fn client_without_explicit_id_derives_one() {
        let config = config(&[("CLIMATE_ROLE", "client")]).unwrap();
        assert!(!config.node_id.is_empty());
        assert_ne!(config.node_id, "host");
    }

    #[test]
    fn role_override_wins_over_env() {
        let config = Config::from_lookup(Some(Role::Host), |key| {
            (key == "CLIMATE_ROLE").then(|| "client".to_string())
        })
        .unwrap();
        assert_eq!(config.role, Role::Host);
    }
}
