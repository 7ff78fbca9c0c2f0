use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::{DeviceGroupRegistry, DeviceGroupSpec, Thresholds};
use crate::error::ConfigurationError;
use crate::hardware::HardwareMode;

/// Environment variable naming an extra TOML file layered over the defaults.
pub const CONFIG_PATH_ENV: &str = "ADR_CONFIG";
const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub controller: ControllerConfig,
    pub thresholds: ThresholdConfig,
    pub groups: Vec<DeviceGroupSpec>,
    pub hardware: HardwareConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub interval_seconds: u64,
    /// Number of actions kept in the in-memory action log
    pub history_capacity: usize,
}

impl ControllerConfig {
    pub fn interval(&self) -> Result<Duration, ConfigurationError> {
        if self.interval_seconds == 0 {
            return Err(ConfigurationError::ZeroInterval);
        }
        Ok(Duration::from_secs(self.interval_seconds))
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 5,
            history_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Shed trigger (kW)
    pub high_kw: f64,
    /// Restore trigger (kW), below `high_kw`
    pub low_kw: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            high_kw: 500.0,
            low_kw: 450.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    pub mode: HardwareMode,
    /// Serial port of the metering bus
    pub port: String,
    pub baudrate: u32,
    /// Simulated meter centre value (kW)
    pub base_load_kw: f64,
    /// Simulated meter noise amplitude (kW)
    pub noise_kw: u32,
    /// Simulated actuation latency per switch command
    pub switch_latency_ms: u64,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            mode: HardwareMode::Simulated,
            port: "/dev/ttyUSB0".to_string(),
            baudrate: 9600,
            base_load_kw: 480.0,
            noise_kw: 40,
            switch_latency_ms: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            thresholds: ThresholdConfig::default(),
            groups: vec![
                DeviceGroupSpec::new("group_a", 3, "AC Units - Zone A"),
                DeviceGroupSpec::new("group_b", 2, "Lighting - Warehouse"),
                DeviceGroupSpec::new("group_c", 1, "Server Room Cooling"),
            ],
            hardware: HardwareConfig::default(),
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `$ADR_CONFIG`, then `ADR__*` env vars.
    pub fn load() -> Result<Self, ConfigurationError> {
        let mut figment = Self::base().merge(Toml::file(DEFAULT_CONFIG_FILE));
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            figment = figment.merge(Toml::file(path));
        }
        Self::extract(figment.merge(Env::prefixed("ADR__").split("__")))
    }

    /// Defaults overlaid with a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigurationError> {
        Self::extract(Self::base().merge(Toml::string(toml)))
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigurationError> {
        let cfg: Config = figment
            .extract()
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check everything the control loop depends on before it starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.controller.interval()?;
        self.thresholds()?;
        self.registry()?;
        Ok(())
    }

    pub fn thresholds(&self) -> Result<Thresholds, ConfigurationError> {
        Thresholds::new(self.thresholds.low_kw, self.thresholds.high_kw)
    }

    pub fn registry(&self) -> Result<DeviceGroupRegistry, ConfigurationError> {
        DeviceGroupRegistry::new(self.groups.clone())
    }
}
