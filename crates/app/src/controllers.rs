//! The periodic controllers.
//!
//! Each controller re-reads the system state at the top of every cycle,
//! decides through the pure functions of `hvac-domain` and switches
//! equipment through an [`Actuator`](crate::actuator::Actuator).

pub mod failsafe;
pub mod heat_source;
pub mod recirculation;
pub mod zone;

pub use failsafe::FailsafeController;
pub use heat_source::{HeatSourceController, HeatSourceSettings};
pub use recirculation::RecirculationController;
pub use zone::ZoneController;
