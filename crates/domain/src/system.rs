//! System singleton — plant-wide mode and coordination flags.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::mode::SystemMode;
use crate::pin::GpioPin;
use crate::time::Timestamp;

/// Plant-wide state shared by every controller through the store.
///
/// Controllers re-read this at the top of every cycle and never cache it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub mode: SystemMode,
    pub override_active: bool,
    pub prior_mode: Option<SystemMode>,
    pub recirculation_active: bool,
    pub recirculation_started_at: Option<Timestamp>,
    pub main_power_pin: GpioPin,
}

impl SystemState {
    /// Fresh state for a first boot: everything off, no flags raised.
    #[must_use]
    pub fn initial(main_power_pin: GpioPin) -> Self {
        Self {
            mode: SystemMode::Off,
            override_active: false,
            prior_mode: None,
            recirculation_active: false,
            recirculation_started_at: None,
            main_power_pin,
        }
    }

    /// Enter a failsafe override, remembering the mode to restore later.
    pub fn apply_override(&mut self, mode: SystemMode) {
        self.prior_mode = Some(self.mode);
        self.mode = mode;
        self.override_active = true;
    }

    /// Leave the failsafe override, restoring the prior mode (or `off`).
    pub fn clear_override(&mut self) {
        self.mode = self.prior_mode.take().unwrap_or_default();
        self.override_active = false;
    }

    pub fn set_recirculation(&mut self, active: bool, started_at: Option<Timestamp>) {
        self.recirculation_active = active;
        self.recirculation_started_at = if active { started_at } else { None };
    }

    /// The recirculation flag has been up for longer than `limit`.
    ///
    /// A raised flag without a start time is treated as stuck.
    #[must_use]
    pub fn recirculation_stuck(&self, now: Timestamp, limit: TimeDelta) -> bool {
        if !self.recirculation_active {
            return false;
        }
        match self.recirculation_started_at {
            Some(started) => now - started > limit,
            None => true,
        }
    }
}
