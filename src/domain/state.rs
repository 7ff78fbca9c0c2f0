use serde::{Deserialize, Serialize};

use super::DeviceGroupRegistry;

/// Power state of one group as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStatus {
    pub id: String,
    pub priority: u64,
    /// `true` = powered, `false` = shed.
    pub powered: bool,
}

/// ON/OFF state of every registered group, indexed like the registry.
///
/// Starts all-powered: nothing is persisted across restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    powered: Vec<bool>,
}

impl GroupState {
    pub fn all_powered(registry: &DeviceGroupRegistry) -> Self {
        Self {
            powered: vec![true; registry.len()],
        }
    }

    /// Build from explicit values in registry order.
    pub fn from_flags(powered: Vec<bool>) -> Self {
        Self { powered }
    }

    pub fn len(&self) -> usize {
        self.powered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powered.is_empty()
    }

    pub fn is_powered(&self, index: usize) -> Option<bool> {
        self.powered.get(index).copied()
    }

    pub fn set(&mut self, index: usize, powered: bool) {
        if let Some(slot) = self.powered.get_mut(index) {
            *slot = powered;
        }
    }

    pub fn flags(&self) -> &[bool] {
        &self.powered
    }

    pub fn shed_count(&self) -> usize {
        self.powered.iter().filter(|on| !**on).count()
    }

    /// Owned per-group view for logging and telemetry.
    pub fn snapshot(&self, registry: &DeviceGroupRegistry) -> Vec<GroupStatus> {
        registry
            .groups()
            .iter()
            .zip(&self.powered)
            .map(|(g, &powered)| GroupStatus {
                id: g.id.clone(),
                priority: g.priority,
                powered,
            })
            .collect()
    }
}
