use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use super::{PowerSensor, PowerSwitch};
use crate::error::{ActuationError, SensorError};

/// Sensor that replays a fixed script of readings.
///
/// Once the script runs out the last value is repeated; an empty script
/// reports the meter as offline.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPowerSensor {
    script: Arc<Mutex<VecDeque<Result<f64, SensorError>>>>,
    last: Arc<Mutex<Option<Result<f64, SensorError>>>>,
}

impl ScriptedPowerSensor {
    pub fn new<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = Result<f64, SensorError>>,
    {
        Self {
            script: Arc::new(Mutex::new(readings.into_iter().collect())),
            last: Arc::new(Mutex::new(None)),
        }
    }

    pub fn from_kw<I: IntoIterator<Item = f64>>(readings: I) -> Self {
        Self::new(readings.into_iter().map(Ok))
    }

    pub fn push(&self, reading: Result<f64, SensorError>) {
        if let Ok(mut q) = self.script.lock() {
            q.push_back(reading);
        }
    }
}

#[async_trait]
impl PowerSensor for ScriptedPowerSensor {
    async fn read_kw(&self) -> Result<f64, SensorError> {
        let next = self
            .script
            .lock()
            .map_err(|e| SensorError::Communication(e.to_string()))?
            .pop_front();
        let mut last = self
            .last
            .lock()
            .map_err(|e| SensorError::Communication(e.to_string()))?;
        if let Some(reading) = next {
            *last = Some(reading);
        }
        last.clone().unwrap_or(Err(SensorError::Offline))
    }
}

/// One command received by a [`RecordingPowerSwitch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCommand {
    pub group_id: String,
    pub on: bool,
    pub succeeded: bool,
}

/// Switch that records every command and can be told to fail per group.
#[derive(Debug, Clone, Default)]
pub struct RecordingPowerSwitch {
    commands: Arc<Mutex<Vec<SwitchCommand>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

impl RecordingPowerSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every further command for `group_id` fail until cleared.
    pub fn fail_group(&self, group_id: impl Into<String>) {
        if let Ok(mut f) = self.failing.lock() {
            f.insert(group_id.into());
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut f) = self.failing.lock() {
            f.clear();
        }
    }

    pub fn commands(&self) -> Vec<SwitchCommand> {
        self.commands.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PowerSwitch for RecordingPowerSwitch {
    async fn set(&self, group_id: &str, on: bool) -> Result<(), ActuationError> {
        let fails = self
            .failing
            .lock()
            .map(|f| f.contains(group_id))
            .unwrap_or(false);

        if let Ok(mut c) = self.commands.lock() {
            c.push(SwitchCommand {
                group_id: group_id.to_string(),
                on,
                succeeded: !fails,
            });
        }

        if fails {
            Err(ActuationError::Communication {
                group: group_id.to_string(),
                reason: "simulated relay fault".to_string(),
            })
        } else {
            Ok(())
        }
    }
}
