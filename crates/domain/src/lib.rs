//! # hvac-domain
//!
//! Pure domain model for the multi-zone hydronic heating/cooling controller.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **modes**, **pins**, **devices** (heat pumps, boiler, air handlers,
//!   radiant loops), **zones**, and the **system state** singleton
//! - Own every decision the controllers make, as pure functions:
//!   - the device timing guard (minimum on/off dwell)
//!   - heat-source role selection and hysteresis thresholds
//!   - per-zone distribution decisions
//!   - recirculation decisions
//!   - failsafe override decisions
//!   - the temperature anomaly filter state machine
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod anomaly;
pub mod device;
pub mod distribution;
pub mod failsafe;
pub mod heat_source;
pub mod mode;
pub mod pin;
pub mod recirculation;
pub mod sensor;
pub mod system;
pub mod zone;
