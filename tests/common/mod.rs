#![allow(dead_code)]
use std::sync::Arc;
use std::time::Duration;

use smart_adr::controller::DemandResponseController;
use smart_adr::domain::{DeviceGroupRegistry, DeviceGroupSpec, Thresholds};
use smart_adr::hardware::{PowerSensor, PowerSwitch, RecordingPowerSwitch, ScriptedPowerSensor};

pub const HIGH_KW: f64 = 500.0;
pub const LOW_KW: f64 = 450.0;

/// Three-group site used by the reference scenarios.
pub fn reference_registry() -> Arc<DeviceGroupRegistry> {
    Arc::new(
        DeviceGroupRegistry::new(vec![
            DeviceGroupSpec::new("group_a", 3, "AC Units - Zone A"),
            DeviceGroupSpec::new("group_b", 2, "Lighting - Warehouse"),
            DeviceGroupSpec::new("group_c", 1, "Server Room Cooling"),
        ])
        .expect("reference registry"),
    )
}

pub fn controller_with(
    sensor: Arc<dyn PowerSensor>,
    switch: Arc<dyn PowerSwitch>,
) -> DemandResponseController {
    DemandResponseController::new(
        reference_registry(),
        Thresholds::new(LOW_KW, HIGH_KW).expect("thresholds"),
        Duration::from_secs(5),
        sensor,
        switch,
    )
    .expect("controller")
}

/// Controller fed by `readings` and a recording switch handle for assertions.
pub fn scripted_controller(
    readings: impl IntoIterator<Item = f64>,
) -> (DemandResponseController, ScriptedPowerSensor, RecordingPowerSwitch) {
    let sensor = ScriptedPowerSensor::from_kw(readings);
    let switch = RecordingPowerSwitch::new();
    let ctl = controller_with(Arc::new(sensor.clone()), Arc::new(switch.clone()));
    (ctl, sensor, switch)
}

/// Group states in registry order as `(id, powered)` pairs.
pub fn states(ctl: &DemandResponseController) -> Vec<(String, bool)> {
    ctl.snapshot()
        .groups
        .into_iter()
        .map(|g| (g.id, g.powered))
        .collect()
}

pub fn expect_states(ctl: &DemandResponseController, expected: &[(&str, bool)]) {
    let expected: Vec<(String, bool)> = expected
        .iter()
        .map(|(id, on)| (id.to_string(), *on))
        .collect();
    assert_eq!(states(ctl), expected);
}
