use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

use crate::error::ConfigurationError;

/// A controllable set of loads switched as one unit.
///
/// Lower `priority` means more critical: shed last, restored first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub id: String,
    pub priority: u64,
    pub description: String,
}

/// Raw group table entry as it appears in configuration, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceGroupSpec {
    pub id: String,
    pub priority: i64,
    pub description: String,
}

impl DeviceGroupSpec {
    pub fn new(id: impl Into<String>, priority: i64, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority,
            description: description.into(),
        }
    }
}

/// Immutable table of device groups with both priority orderings precomputed.
///
/// Orderings are index lists into `groups`. Both come from a stable sort, so
/// groups sharing a rank keep their declaration order.
#[derive(Debug, Clone)]
pub struct DeviceGroupRegistry {
    groups: Vec<DeviceGroup>,
    shed_order: Vec<usize>,
    restore_order: Vec<usize>,
}

impl DeviceGroupRegistry {
    /// Validate a group table and build the registry.
    pub fn new(specs: Vec<DeviceGroupSpec>) -> Result<Self, ConfigurationError> {
        let mut seen = HashSet::with_capacity(specs.len());
        let mut groups = Vec::with_capacity(specs.len());

        for (position, spec) in specs.into_iter().enumerate() {
            let id = spec.id.trim().to_string();
            if id.is_empty() {
                return Err(ConfigurationError::EmptyGroupId(position));
            }
            if !seen.insert(id.clone()) {
                return Err(ConfigurationError::DuplicateGroup(id));
            }
            let priority = match u64::try_from(spec.priority) {
                Ok(p) if p > 0 => p,
                _ => {
                    return Err(ConfigurationError::NonPositivePriority {
                        id,
                        priority: spec.priority,
                    })
                }
            };
            groups.push(DeviceGroup {
                id,
                priority,
                description: spec.description,
            });
        }

        let mut shed_order: Vec<usize> = (0..groups.len()).collect();
        shed_order.sort_by_key(|&i| Reverse(groups[i].priority));

        let mut restore_order: Vec<usize> = (0..groups.len()).collect();
        restore_order.sort_by_key(|&i| groups[i].priority);

        Ok(Self {
            groups,
            shed_order,
            restore_order,
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups in declaration order.
    pub fn groups(&self) -> &[DeviceGroup] {
        &self.groups
    }

    pub fn get(&self, index: usize) -> Option<&DeviceGroup> {
        self.groups.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    /// Least critical first (highest rank number first).
    pub fn shed_order(&self) -> impl Iterator<Item = (usize, &DeviceGroup)> + '_ {
        self.shed_order.iter().map(move |&i| (i, &self.groups[i]))
    }

    /// Most critical first (lowest rank number first).
    pub fn restore_order(&self) -> impl Iterator<Item = (usize, &DeviceGroup)> + '_ {
        self.restore_order.iter().map(move |&i| (i, &self.groups[i]))
    }
}
