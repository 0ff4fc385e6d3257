//! # hvac-app
//!
//! Application layer: controllers, services and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `PinDriver` — relay pins
//!   - `SensorReader` — raw temperature probes
//!   - `Notifier` — push notifications
//!   - `MetricsSink` — temperature gauges
//!   - `SystemRepository`, `ZoneRepository`, `DeviceRepository`,
//!     `SensorRepository` — the persisted store
//!   - `PowerControl` — emergency stop of the whole plant
//! - Provide the device actuation capability (`Actuator`) every controller
//!   switches equipment through
//! - Run the **controllers** (heat source, zone, recirculation, failsafe) and
//!   the anomaly-filtered `TemperatureService` as periodic workers
//! - Expose **command/status services** for driving adapters (HTTP)
//!
//! ## Dependency rule
//! Depends on `hvac-domain` only (plus `tokio` for timers and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actuator;
pub mod controllers;
pub mod equipment;
pub mod ports;
pub mod power;
pub mod services;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
