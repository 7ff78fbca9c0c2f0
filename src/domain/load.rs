use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigurationError, SensorError};

/// One aggregate load measurement in kW.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct LoadSample(f64);

impl LoadSample {
    /// Accept a raw meter value. NaN and infinities are treated as a failed read.
    pub fn new(kw: f64) -> Result<Self, SensorError> {
        if kw.is_finite() {
            Ok(Self(kw))
        } else {
            Err(SensorError::InvalidReading(kw))
        }
    }

    pub fn kw(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for LoadSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kW", self.0)
    }
}

/// Shed trigger `high` and restore trigger `low`, with `low < high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    low_kw: f64,
    high_kw: f64,
}

impl Thresholds {
    pub fn new(low_kw: f64, high_kw: f64) -> Result<Self, ConfigurationError> {
        if !low_kw.is_finite() || !high_kw.is_finite() {
            return Err(ConfigurationError::NonFiniteThreshold {
                low: low_kw,
                high: high_kw,
            });
        }
        if low_kw >= high_kw {
            return Err(ConfigurationError::InvertedThresholds {
                low: low_kw,
                high: high_kw,
            });
        }
        Ok(Self { low_kw, high_kw })
    }

    pub fn low_kw(&self) -> f64 {
        self.low_kw
    }

    pub fn high_kw(&self) -> f64 {
        self.high_kw
    }

    pub fn classify(&self, sample: LoadSample) -> LoadClass {
        classify(sample, self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadClass {
    /// At or above the shed trigger.
    Overload,
    /// Inside the hysteresis band.
    Normal,
    /// At or below the restore trigger.
    Underload,
}

impl fmt::Display for LoadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadClass::Overload => write!(f, "overload"),
            LoadClass::Normal => write!(f, "normal"),
            LoadClass::Underload => write!(f, "underload"),
        }
    }
}

/// Hysteresis classification. Both boundaries are inclusive on their side.
pub fn classify(sample: LoadSample, thresholds: &Thresholds) -> LoadClass {
    let kw = sample.kw();
    if kw >= thresholds.high_kw {
        LoadClass::Overload
    } else if kw <= thresholds.low_kw {
        LoadClass::Underload
    } else {
        LoadClass::Normal
    }
}
