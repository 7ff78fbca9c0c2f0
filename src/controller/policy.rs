//! Shedding and restoration policies.
//!
//! Each policy scans the registry in its priority order and picks the first
//! eligible group. At most one group is selected per call: the controller
//! moves load one step at a time and re-measures before acting again.

use serde::Serialize;

use crate::domain::{DeviceGroup, DeviceGroupRegistry, GroupState};

/// A single group state change chosen by a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub group_index: usize,
    pub group_id: String,
    pub priority: u64,
    /// Target state: `false` sheds, `true` restores.
    pub power_on: bool,
}

impl Decision {
    fn new(group_index: usize, group: &DeviceGroup, power_on: bool) -> Self {
        Self {
            group_index,
            group_id: group.id.clone(),
            priority: group.priority,
            power_on,
        }
    }

    pub fn action(&self) -> &'static str {
        if self.power_on {
            "restore"
        } else {
            "shed"
        }
    }
}

pub trait GroupPolicy: Send + Sync {
    /// `None` means no group is eligible, which is not an error.
    fn decide(&self, registry: &DeviceGroupRegistry, state: &GroupState) -> Option<Decision>;
}

/// Turns off the least critical group that is still powered.
#[derive(Debug, Default, Clone, Copy)]
pub struct SheddingPolicy;

impl GroupPolicy for SheddingPolicy {
    fn decide(&self, registry: &DeviceGroupRegistry, state: &GroupState) -> Option<Decision> {
        registry
            .shed_order()
            .find(|(i, _)| state.is_powered(*i) == Some(true))
            .map(|(i, g)| Decision::new(i, g, false))
    }
}

/// Turns back on the most critical group that is currently shed.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestorationPolicy;

impl GroupPolicy for RestorationPolicy {
    fn decide(&self, registry: &DeviceGroupRegistry, state: &GroupState) -> Option<Decision> {
        registry
            .restore_order()
            .find(|(i, _)| state.is_powered(*i) == Some(false))
            .map(|(i, g)| Decision::new(i, g, true))
    }
}
