//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HvacError`]
//! via `#[from]` / `From` impls. The variants mirror the three tiers the
//! controllers care about: recoverable validation/lookup problems, adapter
//! failures (storage, hardware), and [`FatalError`]s that require a
//! controlled shutdown of the plant.

use crate::mode::SystemMode;

/// Root error type shared by the domain, application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum HvacError {
    /// A domain invariant or request payload was rejected.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A referenced record does not exist.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The plant is in a state the controllers must not operate in.
    #[error("fatal condition")]
    Fatal(#[from] FatalError),

    /// The persisted store failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A pin driver or sensor reader failed.
    #[error("hardware error")]
    Hardware(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl HvacError {
    /// Whether this error must bring the whole plant down.
    ///
    /// Storage errors count as fatal because every controller relies on the
    /// store as its single source of truth.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Storage(_))
    }
}

/// Rejected input or broken domain invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("unknown mode {0:?}")]
    UnknownMode(String),

    #[error("zone {zone} does not support mode {mode}")]
    UnsupportedZoneMode { zone: String, mode: SystemMode },

    #[error("zone {0} has no air handler, cannot circulate")]
    CirculateWithoutAirHandler(String),

    #[error("setpoint {value} outside allowed range [{min}, {max}]")]
    SetpointOutOfRange { value: f64, min: f64, max: f64 },

    #[error("zone {zone} is in {zone_mode} while the system is in {system_mode}")]
    OppositeMode {
        zone: String,
        zone_mode: SystemMode,
        system_mode: SystemMode,
    },

    #[error("zone {0} has no distribution device")]
    NoDistributor(String),

    #[error("invalid identifier {0:?}")]
    InvalidId(String),

    #[error("max_anomalies must be at least 1")]
    NoAnomalyLimit,

    #[error("history_size {history_size} must hold max_anomalies {max_anomalies} plus two readings")]
    AnomalyHistoryTooShort {
        history_size: usize,
        max_anomalies: usize,
    },
}

/// A lookup that found nothing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// Conditions that leave the plant in an unknown state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FatalError {
    #[error("no heat pump is marked as primary")]
    NoPrimaryHeatPump,

    #[error("{0} heat pumps are marked as primary")]
    MultiplePrimaryHeatPumps(usize),

    #[error("tertiary heat source requested in cooling mode")]
    TertiaryInCooling,

    #[error("buffer tank sensor disabled after {0} consecutive anomalies")]
    BufferSensorDisabled(usize),

    #[error("persisted store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("pin {pin} ({name}) is in the wrong state at startup (expected active={expected_active})")]
    UnsafePinState {
        name: String,
        pin: u8,
        expected_active: bool,
    },
}
