//! Finer-grained comfort ladders layered over the canonical status.
//!
//! These are only used to enrich controller log lines; persisted and reported
//! records always carry the four-state `EvaluationStatus`.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HumidityBand {
    VeryDry,
    Dry,
    Optimal,
    Humid,
    VeryHumid,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemperatureBand {
    VeryCold,
    Cold,
    Optimal,
    Warm,
    Hot,
    VeryHot,
}

const HUMIDITY_VERY_DRY: f64 = 45.0;
const HUMIDITY_DRY: f64 = 50.0;
const HUMIDITY_OPTIMAL_HIGH: f64 = 65.0;
const HUMIDITY_HUMID: f64 = 75.0;
const HUMIDITY_VERY_HUMID: f64 = 85.0;

const TEMP_VERY_COLD: f64 = 15.0;
const TEMP_COLD: f64 = 20.0;
const TEMP_OPTIMAL_HIGH: f64 = 27.0;
const TEMP_WARM: f64 = 30.0;
const TEMP_HOT: f64 = 35.0;

// Gaps between the named bands (e.g. 50..51 %) fall into the band below.
pub fn classify_humidity(value: f64) -> HumidityBand {
    if value < HUMIDITY_VERY_DRY {
        HumidityBand::VeryDry
    } else if value <= HUMIDITY_DRY {
        HumidityBand::Dry
    } else if value <= HUMIDITY_OPTIMAL_HIGH {
        HumidityBand::Optimal
    } else if value <= HUMIDITY_HUMID {
        HumidityBand::Humid
    } else if value <= HUMIDITY_VERY_HUMID {
        HumidityBand::VeryHumid
    } else {
        HumidityBand::Critical
    }
}

pub fn classify_temperature(value: f64) -> TemperatureBand {
    if value < TEMP_VERY_COLD {
        TemperatureBand::VeryCold
    } else if value <= TEMP_COLD {
        TemperatureBand::Cold
    } else if value <= TEMP_OPTIMAL_HIGH {
        TemperatureBand::Optimal
    } else if value <= TEMP_WARM {
        TemperatureBand::Warm
    } else if value <= TEMP_HOT {
        TemperatureBand::Hot
    } else {
        TemperatureBand::VeryHot
    }
}
