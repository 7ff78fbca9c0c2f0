use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

use super::Decision;

/// Result of one attempted switch commit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ActionRecord {
    Committed {
        decision: Decision,
        load_kw: f64,
    },
    Failed {
        decision: Decision,
        load_kw: f64,
        error: String,
    },
}

impl ActionRecord {
    pub fn decision(&self) -> &Decision {
        match self {
            ActionRecord::Committed { decision, .. } | ActionRecord::Failed { decision, .. } => {
                decision
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, ActionRecord::Committed { .. })
    }
}

/// Bounded log of shed/restore actions, oldest dropped first.
#[derive(Debug, Clone)]
pub struct ActionLog {
    entries: VecDeque<(DateTime<Utc>, ActionRecord)>,
    capacity: usize,
}

impl ActionLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn record(&mut self, timestamp: DateTime<Utc>, record: ActionRecord) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back((timestamp, record));
        if self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Up to `count` most recent entries, oldest first.
    pub fn recent(&self, count: usize) -> Vec<(DateTime<Utc>, ActionRecord)> {
        let start = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for ActionLog {
    fn default() -> Self {
        Self::with_capacity(100)
    }
}
