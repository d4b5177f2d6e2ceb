use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed interval `[min, max]` a metric is expected to stay within.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn evaluate(&self, value: Option<f64>) -> EvaluationStatus {
        evaluate(value, self.min, self.max)
    }
}

/// Per-metric ranges, loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub temperature: ThresholdRange,
    pub humidity: ThresholdRange,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            temperature: ThresholdRange::new(18.0, 26.0),
            humidity: ThresholdRange::new(40.0, 70.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvaluationStatus {
    Invalid,
    Low,
    High,
    Stable,
}

impl EvaluationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EvaluationStatus::Invalid => "INVALID",
            EvaluationStatus::Low => "LOW",
            EvaluationStatus::High => "HIGH",
            EvaluationStatus::Stable => "STABLE",
        }
    }

    /// Two-state view; `/sensor-data` exposes it next to the status.
    pub fn alert_level(self) -> AlertLevel {
        match self {
            EvaluationStatus::Invalid => AlertLevel::Invalid,
            EvaluationStatus::Stable => AlertLevel::Ok,
            EvaluationStatus::Low | EvaluationStatus::High => AlertLevel::Alert,
        }
    }
}

impl fmt::Display for EvaluationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvaluationStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INVALID" => Ok(EvaluationStatus::Invalid),
            "LOW" => Ok(EvaluationStatus::Low),
            "HIGH" => Ok(EvaluationStatus::High),
            "STABLE" => Ok(EvaluationStatus::Stable),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Invalid,
    Ok,
    Alert,
}

/// Bounds are inclusive on both ends; an absent value is `Invalid`.
pub fn evaluate(value: Option<f64>, low: f64, high: f64) -> EvaluationStatus {
    match value {
        None => EvaluationStatus::Invalid,
        Some(v) if v < low => EvaluationStatus::Low,
        Some(v) if v > high => EvaluationStatus::High,
        Some(_) => EvaluationStatus::Stable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_value_is_invalid() {
        assert_eq!(evaluate(None, 18.0, 26.0), EvaluationStatus::Invalid);
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(evaluate(Some(18.0), 18.0, 26.0), EvaluationStatus::Stable);
        assert_eq!(evaluate(Some(26.0), 18.0, 26.0), EvaluationStatus::Stable);
        assert_eq!(evaluate(Some(17.999), 18.0, 26.0), EvaluationStatus::Low);
        assert_eq!(evaluate(Some(26.001), 18.0, 26.0), EvaluationStatus::High);
    }

    #[test]
    fn exactly_one_branch_holds_across_a_sweep() {
        let (low, high) = (40.0, 70.0);
        let mut v = 30.0;
        while v <= 80.0 {
            let status = evaluate(Some(v), low, high);
            let expected = if v < low {
                EvaluationStatus::Low
            } else if v > high {
                EvaluationStatus::High
            } else {
                EvaluationStatus::Stable
            };
            assert_eq!(status, expected, "value {v}");
            v += 0.5;
        }
    }

    #[test]
    fn degenerate_range_accepts_only_its_point() {
        assert_eq!(evaluate(Some(21.0), 21.0, 21.0), EvaluationStatus::Stable);
        assert_eq!(evaluate(Some(20.9), 21.0, 21.0), EvaluationStatus::Low);
    }

    #[test]
    fn alert_view_collapses_low_and_high() {
        assert_eq!(EvaluationStatus::Stable.alert_level(), AlertLevel::Ok);
        assert_eq!(EvaluationStatus::Low.alert_level(), AlertLevel::Alert);
        assert_eq!(EvaluationStatus::High.alert_level(), AlertLevel::Alert);
        assert_eq!(EvaluationStatus::Invalid.alert_level(), AlertLevel::Invalid);
    }

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("stable".parse(), Ok(EvaluationStatus::Stable));
        assert_eq!(" HIGH ".parse(), Ok(EvaluationStatus::High));
        assert!("ALERT".parse::<EvaluationStatus>().is_err());
    }
}
