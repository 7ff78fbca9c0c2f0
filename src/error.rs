use thiserror::Error;

/// Invalid thresholds, group table or loop settings. Fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Thresholds must be finite numbers (low={low}, high={high})")]
    NonFiniteThreshold { low: f64, high: f64 },
    #[error("Low threshold {low} kW must be strictly below high threshold {high} kW")]
    InvertedThresholds { low: f64, high: f64 },
    #[error("Device group at position {0} has an empty id")]
    EmptyGroupId(usize),
    #[error("Duplicate device group id: {0}")]
    DuplicateGroup(String),
    #[error("Device group {id} has non-positive priority {priority}")]
    NonPositivePriority { id: String, priority: i64 },
    #[error("Control loop interval must be positive")]
    ZeroInterval,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A single cycle's load sample could not be obtained.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    #[error("Power meter communication error: {0}")]
    Communication(String),
    #[error("Power meter returned an invalid reading: {0}")]
    InvalidReading(f64),
    #[error("Power meter offline or unavailable")]
    Offline,
}

/// A switch command did not complete.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActuationError {
    #[error("Switch communication error for group {group}: {reason}")]
    Communication { group: String, reason: String },
    #[error("Unknown device group: {0}")]
    UnknownGroup(String),
    #[error("Switch rejected command for group {0}")]
    Rejected(String),
}
