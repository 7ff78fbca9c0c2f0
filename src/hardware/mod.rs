//! Metering and switching capabilities consumed by the controller.
//!
//! The controller only sees the two traits below. Real transports (RS485 /
//! Modbus meters, relay boards) plug in behind them; this crate ships a
//! simulated pair for development and scripted fakes for tests.

pub mod factory;
pub mod mock;
pub mod simulated;

use async_trait::async_trait;

use crate::error::{ActuationError, SensorError};

pub use factory::*;
pub use mock::*;
pub use simulated::*;

/// Source of the aggregate load measurement.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PowerSensor: Send + Sync {
    /// Current aggregate load in kW.
    async fn read_kw(&self) -> Result<f64, SensorError>;
}

/// Commits ON/OFF commands to a device group.
///
/// The call may take as long as the physical actuation does. The controller
/// awaits it in-line and never races it against cancellation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PowerSwitch: Send + Sync {
    async fn set(&self, group_id: &str, on: bool) -> Result<(), ActuationError>;
}
