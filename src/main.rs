use anyhow::{Context, Result};
use smart_adr::{config, controller, hardware, telemetry};
use config::Config;
use controller::DemandResponseController;
use hardware::DeviceFactory;
use std::sync::Arc;
use telemetry::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load().context("failed to load configuration")?;
    let registry = Arc::new(cfg.registry().context("invalid device group table")?);
    let thresholds = cfg.thresholds().context("invalid demand thresholds")?;
    let interval = cfg.controller.interval().context("invalid loop interval")?;

    let factory = DeviceFactory::new(cfg.hardware.clone());
    let sensor = factory.create_sensor();
    let switch = factory.create_switch(&registry);

    let mut adr = DemandResponseController::new(registry, thresholds, interval, sensor, switch)
        .context("failed to build controller")?
        .with_history_capacity(cfg.controller.history_capacity);

    let cancel = CancellationToken::new();
    telemetry::spawn_signal_listener(cancel.clone());

    info!(mode = ?factory.mode(), "Smart ADR system starting");
    adr.run(cancel).await;

    info!(
        actions = adr.history().len(),
        shed_groups = adr.group_state().shed_count(),
        "System stopping..."
    );
    Ok(())
}
