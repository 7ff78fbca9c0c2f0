use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Duration;

use super::{
    PowerSensor, PowerSwitch, RecordingPowerSwitch, ScriptedPowerSensor, SimulatedPowerMeter,
    SimulatedSwitchBank,
};
use crate::config::HardwareConfig;
use crate::domain::DeviceGroupRegistry;

/// Hardware mode configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareMode {
    /// Randomised meter and latency-bound relay bank
    Simulated,
    /// Constant meter reading and a recording switch, no latency
    Mock,
}

/// Builds the sensor/switch pair the controller runs against.
pub struct DeviceFactory {
    config: HardwareConfig,
}

impl DeviceFactory {
    pub fn new(config: HardwareConfig) -> Self {
        Self { config }
    }

    pub fn mode(&self) -> HardwareMode {
        self.config.mode
    }

    pub fn create_sensor(&self) -> Arc<dyn PowerSensor> {
        match self.config.mode {
            HardwareMode::Simulated => {
                tracing::info!(
                    port = %self.config.port,
                    baudrate = self.config.baudrate,
                    base_load_kw = self.config.base_load_kw,
                    noise_kw = self.config.noise_kw,
                    "using simulated power meter"
                );
                Arc::new(SimulatedPowerMeter::new(
                    self.config.base_load_kw,
                    self.config.noise_kw,
                ))
            }
            HardwareMode::Mock => {
                tracing::warn!(
                    load_kw = self.config.base_load_kw,
                    "mock power meter reports a constant load"
                );
                Arc::new(ScriptedPowerSensor::from_kw([self.config.base_load_kw]))
            }
        }
    }

    pub fn create_switch(&self, registry: &DeviceGroupRegistry) -> Arc<dyn PowerSwitch> {
        match self.config.mode {
            HardwareMode::Simulated => Arc::new(SimulatedSwitchBank::new(
                registry.groups().iter().map(|g| g.id.clone()),
                Duration::from_millis(self.config.switch_latency_ms),
            )),
            HardwareMode::Mock => Arc::new(RecordingPowerSwitch::new()),
        }
    }
}
