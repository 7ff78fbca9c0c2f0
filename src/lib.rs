//! Smart ADR: automated demand response for aggregate site load.
//!
//! Samples the site meter on a fixed interval, classifies the load against a
//! high/low hysteresis band and sheds or restores at most one device group per
//! cycle, in priority order.

pub mod config;
pub mod controller;
pub mod domain;
pub mod error;
pub mod hardware;
pub mod telemetry;
