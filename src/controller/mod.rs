pub mod history;
pub mod policy;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::domain::{
    classify, DeviceGroupRegistry, GroupState, GroupStatus, LoadClass, LoadSample, Thresholds,
};
use crate::error::{ActuationError, ConfigurationError, SensorError};
use crate::hardware::{PowerSensor, PowerSwitch};

pub use history::{ActionLog, ActionRecord};
pub use policy::{Decision, GroupPolicy, RestorationPolicy, SheddingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    Running,
    /// Terminal. Reached only through cancellation.
    Stopped,
}

/// What a single control cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// No sample this cycle; nothing was classified or switched.
    SensorFailed(SensorError),
    /// Load inside the hysteresis band.
    Idle { sample: LoadSample },
    /// Overload with everything already shed, or underload with nothing shed.
    NoEligibleGroup { sample: LoadSample, class: LoadClass },
    Applied { sample: LoadSample, decision: Decision },
    /// Switch refused the command; group state left untouched.
    ActuationFailed {
        sample: LoadSample,
        decision: Decision,
        error: ActuationError,
    },
}

impl CycleOutcome {
    pub fn state_changed(&self) -> bool {
        matches!(self, CycleOutcome::Applied { .. })
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            CycleOutcome::Applied { decision, .. }
            | CycleOutcome::ActuationFailed { decision, .. } => Some(decision),
            _ => None,
        }
    }
}

/// Read-only view of the controller published after every cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cycle: u64,
    pub mode: LoopMode,
    pub load_kw: Option<f64>,
    pub class: Option<LoadClass>,
    pub groups: Vec<GroupStatus>,
}

/// Threshold-driven demand response loop.
///
/// Each cycle samples the meter, classifies the load and applies at most one
/// shed or restore. Group state is owned here and only changes after the
/// switch confirms the command.
pub struct DemandResponseController {
    registry: Arc<DeviceGroupRegistry>,
    thresholds: Thresholds,
    interval: Duration,
    sensor: Arc<dyn PowerSensor>,
    switch: Arc<dyn PowerSwitch>,
    shedding: SheddingPolicy,
    restoration: RestorationPolicy,
    state: GroupState,
    history: ActionLog,
    mode: LoopMode,
    cycles: u64,
    last_sample: Option<(LoadSample, LoadClass)>,
    snapshots: watch::Sender<ControllerSnapshot>,
}

impl DemandResponseController {
    pub fn new(
        registry: Arc<DeviceGroupRegistry>,
        thresholds: Thresholds,
        interval: Duration,
        sensor: Arc<dyn PowerSensor>,
        switch: Arc<dyn PowerSwitch>,
    ) -> Result<Self, ConfigurationError> {
        if interval.is_zero() {
            return Err(ConfigurationError::ZeroInterval);
        }
        let state = GroupState::all_powered(&registry);
        let initial = ControllerSnapshot {
            timestamp: Utc::now(),
            cycle: 0,
            mode: LoopMode::Running,
            load_kw: None,
            class: None,
            groups: state.snapshot(&registry),
        };
        let (snapshots, _) = watch::channel(initial);

        Ok(Self {
            registry,
            thresholds,
            interval,
            sensor,
            switch,
            shedding: SheddingPolicy,
            restoration: RestorationPolicy,
            state,
            history: ActionLog::default(),
            mode: LoopMode::Running,
            cycles: 0,
            last_sample: None,
            snapshots,
        })
    }

    pub fn from_config(
        cfg: &Config,
        sensor: Arc<dyn PowerSensor>,
        switch: Arc<dyn PowerSwitch>,
    ) -> Result<Self, ConfigurationError> {
        let controller = Self::new(
            Arc::new(cfg.registry()?),
            cfg.thresholds()?,
            cfg.controller.interval()?,
            sensor,
            switch,
        )?;
        Ok(controller.with_history_capacity(cfg.controller.history_capacity))
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history = ActionLog::with_capacity(capacity);
        self
    }

    pub fn registry(&self) -> &DeviceGroupRegistry {
        &self.registry
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Copy of the current group state.
    pub fn group_state(&self) -> GroupState {
        self.state.clone()
    }

    pub fn history(&self) -> &ActionLog {
        &self.history
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            timestamp: Utc::now(),
            cycle: self.cycles,
            mode: self.mode,
            load_kw: self.last_sample.map(|(s, _)| s.kw()),
            class: self.last_sample.map(|(_, c)| c),
            groups: self.state.snapshot(&self.registry),
        }
    }

    /// Receiver that sees a fresh snapshot after every cycle.
    pub fn subscribe(&self) -> watch::Receiver<ControllerSnapshot> {
        self.snapshots.subscribe()
    }

    /// Run cycles until `cancel` fires.
    ///
    /// Cancellation is observed before each cycle and while sleeping, never
    /// during a switch commit. A switch call that never returns therefore
    /// also blocks shutdown.
    pub async fn run(&mut self, cancel: CancellationToken) {
        if self.mode == LoopMode::Stopped {
            warn!("controller already stopped, not restarting");
            return;
        }

        info!(
            groups = self.registry.len(),
            high_kw = self.thresholds.high_kw(),
            low_kw = self.thresholds.low_kw(),
            interval_ms = self.interval.as_millis() as u64,
            "Smart ADR controller started"
        );

        while !cancel.is_cancelled() {
            self.run_cycle().await;

            let interval = self.interval;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.mode = LoopMode::Stopped;
        self.publish();
        info!(cycles = self.cycles, shed = self.state.shed_count(), "controller stopped");
    }

    /// One sample → classify → act pass. Never fails: errors end up in the outcome.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.cycles += 1;
        let outcome = self.evaluate().await;
        self.publish();
        outcome
    }

    async fn evaluate(&mut self) -> CycleOutcome {
        let sample = match self.sensor.read_kw().await.and_then(LoadSample::new) {
            Ok(sample) => sample,
            Err(e) => {
                self.last_sample = None;
                warn!(error = %e, cycle = self.cycles, "load sample unavailable, skipping cycle");
                return CycleOutcome::SensorFailed(e);
            }
        };

        let class = classify(sample, &self.thresholds);
        self.last_sample = Some((sample, class));
        info!(load_kw = sample.kw(), %class, "current load");

        let decision = match class {
            LoadClass::Overload => {
                warn!(
                    load_kw = sample.kw(),
                    high_kw = self.thresholds.high_kw(),
                    "demand limit exceeded, initiating load shedding"
                );
                self.shedding.decide(&self.registry, &self.state)
            }
            LoadClass::Underload => {
                info!(
                    load_kw = sample.kw(),
                    low_kw = self.thresholds.low_kw(),
                    "load is stable, attempting restoration"
                );
                self.restoration.decide(&self.registry, &self.state)
            }
            LoadClass::Normal => {
                info!("load within normal range, no action needed");
                return CycleOutcome::Idle { sample };
            }
        };

        match decision {
            Some(decision) => self.commit(sample, decision).await,
            None => {
                info!(%class, "no eligible group for this cycle");
                CycleOutcome::NoEligibleGroup { sample, class }
            }
        }
    }

    async fn commit(&mut self, sample: LoadSample, decision: Decision) -> CycleOutcome {
        info!(
            group = %decision.group_id,
            priority = decision.priority,
            action = decision.action(),
            "switching group"
        );

        match self
            .switch
            .set(&decision.group_id, decision.power_on)
            .await
        {
            Ok(()) => {
                self.state.set(decision.group_index, decision.power_on);
                self.history.record(
                    Utc::now(),
                    ActionRecord::Committed {
                        decision: decision.clone(),
                        load_kw: sample.kw(),
                    },
                );
                CycleOutcome::Applied { sample, decision }
            }
            Err(e) => {
                error!(
                    group = %decision.group_id,
                    action = decision.action(),
                    error = %e,
                    "switch command failed, group state unchanged"
                );
                self.history.record(
                    Utc::now(),
                    ActionRecord::Failed {
                        decision: decision.clone(),
                        load_kw: sample.kw(),
                        error: e.to_string(),
                    },
                );
                CycleOutcome::ActuationFailed {
                    sample,
                    decision,
                    error: e,
                }
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DeviceGroupSpec;
    use crate::hardware::{MockPowerSensor, MockPowerSwitch};

    fn reference_registry() -> Arc<DeviceGroupRegistry> {
        Arc::new(
            DeviceGroupRegistry::new(vec![
                DeviceGroupSpec::new("group_a", 3, "AC Units - Zone A"),
                DeviceGroupSpec::new("group_b", 2, "Lighting - Warehouse"),
                DeviceGroupSpec::new("group_c", 1, "Server Room Cooling"),
            ])
            .unwrap(),
        )
    }

    fn controller(sensor: MockPowerSensor, switch: MockPowerSwitch) -> DemandResponseController {
        DemandResponseController::new(
            reference_registry(),
            Thresholds::new(450.0, 500.0).unwrap(),
            Duration::from_secs(5),
            Arc::new(sensor),
            Arc::new(switch),
        )
        .unwrap()
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = DemandResponseController::new(
            reference_registry(),
            Thresholds::new(450.0, 500.0).unwrap(),
            Duration::ZERO,
            Arc::new(MockPowerSensor::new()),
            Arc::new(MockPowerSwitch::new()),
        );
        assert!(matches!(result, Err(ConfigurationError::ZeroInterval)));
    }

    #[tokio::test]
    async fn test_actuation_failure_leaves_state_unchanged() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().times(2).returning(|| Ok(520.0));

        let mut switch = MockPowerSwitch::new();
        switch
            .expect_set()
            .withf(|group, on| group.to_string() == "group_a" && !*on)
            .times(2)
            .returning(|group, _| Err(ActuationError::Rejected(group.to_string())));

        let mut ctl = controller(sensor, switch);

        let outcome = ctl.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::ActuationFailed { .. }));
        assert_eq!(outcome.decision().unwrap().group_id, "group_a");
        assert_eq!(ctl.group_state().flags(), &[true, true, true]);

        // Same state, so the next cycle picks the same group again.
        let outcome = ctl.run_cycle().await;
        assert_eq!(outcome.decision().unwrap().group_id, "group_a");
        assert_eq!(ctl.group_state().flags(), &[true, true, true]);

        assert_eq!(ctl.history().len(), 2);
        assert!(ctl.history().recent(1).iter().all(|(_, r)| !r.succeeded()));
    }

    #[tokio::test]
    async fn test_sensor_failure_skips_classification_and_switching() {
        let mut sensor = MockPowerSensor::new();
        sensor
            .expect_read_kw()
            .times(1)
            .returning(|| Err(SensorError::Communication("timeout".into())));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().never();

        let mut ctl = controller(sensor, switch);
        let outcome = ctl.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::SensorFailed(SensorError::Communication("timeout".into()))
        );
        assert_eq!(ctl.snapshot().load_kw, None);
        assert_eq!(ctl.cycles(), 1);
    }

    #[tokio::test]
    async fn test_failed_read_clears_previous_load_from_snapshot() {
        let mut sensor = MockPowerSensor::new();
        let mut seq = mockall::Sequence::new();
        sensor
            .expect_read_kw()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(475.0));
        sensor
            .expect_read_kw()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(SensorError::Offline));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().never();

        let mut ctl = controller(sensor, switch);
        let rx = ctl.subscribe();

        ctl.run_cycle().await;
        assert_eq!(rx.borrow().load_kw, Some(475.0));
        assert_eq!(rx.borrow().class, Some(LoadClass::Normal));

        let outcome = ctl.run_cycle().await;
        assert_eq!(outcome, CycleOutcome::SensorFailed(SensorError::Offline));
        let snap = rx.borrow().clone();
        assert_eq!(snap.cycle, 2);
        assert_eq!(snap.load_kw, None);
        assert_eq!(snap.class, None);
    }

    #[tokio::test]
    async fn test_nan_reading_is_treated_as_sensor_failure() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().returning(|| Ok(f64::NAN));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().never();

        let mut ctl = controller(sensor, switch);
        assert!(matches!(
            ctl.run_cycle().await,
            CycleOutcome::SensorFailed(SensorError::InvalidReading(_))
        ));
    }

    #[tokio::test]
    async fn test_normal_cycles_are_idempotent() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().times(10).returning(|| Ok(475.0));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().never();

        let mut ctl = controller(sensor, switch);
        let before = ctl.group_state();
        for _ in 0..10 {
            let outcome = ctl.run_cycle().await;
            assert!(matches!(outcome, CycleOutcome::Idle { .. }));
        }
        assert_eq!(ctl.group_state(), before);
        assert!(ctl.history().is_empty());
    }

    #[tokio::test]
    async fn test_underload_with_nothing_shed_is_no_action() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().returning(|| Ok(450.0));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().never();

        let mut ctl = controller(sensor, switch);
        assert!(matches!(
            ctl.run_cycle().await,
            CycleOutcome::NoEligibleGroup {
                class: LoadClass::Underload,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_snapshot_published_after_cycle() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().returning(|| Ok(500.0));
        let mut switch = MockPowerSwitch::new();
        switch.expect_set().returning(|_, _| Ok(()));

        let mut ctl = controller(sensor, switch);
        let rx = ctl.subscribe();
        assert_eq!(rx.borrow().cycle, 0);

        ctl.run_cycle().await;

        let snap = rx.borrow().clone();
        assert_eq!(snap.cycle, 1);
        assert_eq!(snap.load_kw, Some(500.0));
        assert_eq!(snap.class, Some(LoadClass::Overload));
        assert!(!snap.groups[0].powered);
        assert!(snap.groups[1].powered);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_no_cycle() {
        let mut sensor = MockPowerSensor::new();
        sensor.expect_read_kw().never();
        let switch = MockPowerSwitch::new();

        let mut ctl = controller(sensor, switch);
        let token = CancellationToken::new();
        token.cancel();
        ctl.run(token).await;

        assert_eq!(ctl.mode(), LoopMode::Stopped);
        assert_eq!(ctl.cycles(), 0);
    }
}
