use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{sleep, Duration};
use tracing::info;

use super::{PowerSensor, PowerSwitch};
use crate::error::{ActuationError, SensorError};

/// Meter simulation: a base load with uniform integer noise on top.
///
/// Oscillates across the default thresholds so that all three load classes
/// show up in a development run.
#[derive(Debug, Clone)]
pub struct SimulatedPowerMeter {
    pub base_load_kw: f64,
    pub noise_kw: u32,
}

impl SimulatedPowerMeter {
    pub fn new(base_load_kw: f64, noise_kw: u32) -> Self {
        Self {
            base_load_kw,
            noise_kw,
        }
    }
}

impl Default for SimulatedPowerMeter {
    fn default() -> Self {
        Self::new(480.0, 40)
    }
}

#[async_trait]
impl PowerSensor for SimulatedPowerMeter {
    async fn read_kw(&self) -> Result<f64, SensorError> {
        let n = i64::from(self.noise_kw);
        let noise = rand::thread_rng().gen_range(-n..=n);
        Ok(self.base_load_kw + noise as f64)
    }
}

/// Relay bank simulation with fixed actuation latency.
#[derive(Debug)]
pub struct SimulatedSwitchBank {
    outputs: Arc<RwLock<HashMap<String, bool>>>,
    /// Simulated hardware latency per command
    pub latency: Duration,
}

impl SimulatedSwitchBank {
    /// All known groups start energised.
    pub fn new<I, S>(group_ids: I, latency: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let outputs = group_ids.into_iter().map(|id| (id.into(), true)).collect();
        Self {
            outputs: Arc::new(RwLock::new(outputs)),
            latency,
        }
    }

    /// Last commanded state of a group.
    pub async fn output(&self, group_id: &str) -> Option<bool> {
        self.outputs.read().await.get(group_id).copied()
    }
}

#[async_trait]
impl PowerSwitch for SimulatedSwitchBank {
    async fn set(&self, group_id: &str, on: bool) -> Result<(), ActuationError> {
        if !self.outputs.read().await.contains_key(group_id) {
            return Err(ActuationError::UnknownGroup(group_id.to_string()));
        }

        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }

        self.outputs.write().await.insert(group_id.to_string(), on);
        info!(
            group = group_id,
            action = if on { "ON" } else { "OFF" },
            "hardware: group switched"
        );
        Ok(())
    }
}
