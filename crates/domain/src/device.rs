//! Devices — relay-driven plant equipment and the dwell-time guard.
//!
//! Every piece of equipment shares a [`Device`] core: a relay pin, minimum
//! on/off dwell times, an online flag and the time of its last real state
//! transition. The typed wrappers add what each kind needs on top.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{HvacError, ValidationError};
use crate::id::ZoneId;
use crate::mode::SystemMode;
use crate::pin::GpioPin;
use crate::time::Timestamp;

/// Discriminator used by storage and by the status surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    HeatPump,
    Boiler,
    AirHandler,
    RadiantFloor,
}

impl DeviceKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeatPump => "heat_pump",
            Self::Boiler => "boiler",
            Self::AirHandler => "air_handler",
            Self::RadiantFloor => "radiant_floor",
        }
    }
}

/// Shared core of every relay-driven device.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub name: String,
    pub pin: GpioPin,
    pub min_on: TimeDelta,
    pub min_off: TimeDelta,
    pub online: bool,
    pub last_changed: Timestamp,
    pub active_modes: Vec<SystemMode>,
}

impl Device {
    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HvacError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), HvacError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }

    /// Dwell-time guard.
    ///
    /// `currently_active` must come from the physical pin level, never from
    /// bookkeeping. Returns `true` once the device has spent at least the
    /// dwell time for its current state since `last_changed`.
    #[must_use]
    pub fn can_toggle(&self, currently_active: bool, now: Timestamp) -> bool {
        let elapsed = now - self.last_changed;
        let dwell = if currently_active {
            self.min_on
        } else {
            self.min_off
        };
        elapsed >= dwell
    }

    /// Time since the last real transition.
    #[must_use]
    pub fn since_last_change(&self, now: Timestamp) -> TimeDelta {
        now - self.last_changed
    }

    /// Whether the device is configured to run in `mode`.
    #[must_use]
    pub fn supports(&self, mode: SystemMode) -> bool {
        self.active_modes.contains(&mode)
    }

    /// Record a real state transition.
    pub fn mark_changed(&mut self, now: Timestamp) {
        self.last_changed = now;
    }
}

/// Heat pump: primary or secondary buffer heat source with a mode-select pin.
///
/// The mode pin is active when the unit is set to cooling.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatPump {
    pub device: Device,
    pub mode_pin: GpioPin,
    pub is_primary: bool,
    pub last_rotated: Timestamp,
}

/// Boiler: tertiary, heating-only source.
#[derive(Debug, Clone, PartialEq)]
pub struct Boiler {
    pub device: Device,
}

/// Air handler: the blower is driven by `device.pin`, the coil's circulation
/// pump by `circ_pump_pin`.
#[derive(Debug, Clone, PartialEq)]
pub struct AirHandler {
    pub device: Device,
    pub zone_id: ZoneId,
    pub circ_pump_pin: GpioPin,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadiantFloorLoop {
    pub device: Device,
    pub zone_id: ZoneId,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn device(min_on: i64, min_off: i64) -> Device {
        Device {
            name: "hp1".to_string(),
            pin: GpioPin::new(17, true),
            min_on: TimeDelta::minutes(min_on),
            min_off: TimeDelta::minutes(min_off),
            online: true,
            last_changed: t0(),
            active_modes: vec![SystemMode::Heating, SystemMode::Cooling],
        }
    }

    #[test]
    fn should_deny_toggle_when_active_and_min_on_not_elapsed() {
        let dev = device(10, 5);
        assert!(!dev.can_toggle(true, t0() + TimeDelta::minutes(9)));
    }

    #[test]
    fn should_allow_toggle_when_active_and_min_on_elapsed() {
        let dev = device(10, 5);
        assert!(dev.can_toggle(true, t0() + TimeDelta::minutes(10)));
    }

    #[test]
    fn should_use_min_off_when_inactive() {
        let dev = device(10, 5);
        assert!(!dev.can_toggle(false, t0() + TimeDelta::minutes(4)));
        assert!(dev.can_toggle(false, t0() + TimeDelta::minutes(5)));
        assert!(dev.can_toggle(false, t0() + TimeDelta::minutes(7)));
    }

    #[test]
    fn should_deny_toggle_when_clock_is_behind_last_change() {
        let dev = device(0, 0);
        assert!(!dev.can_toggle(false, t0() - TimeDelta::seconds(1)));
    }

    #[test]
    fn should_only_move_last_changed_when_marked() {
        let mut dev = device(1, 1);
        let later = t0() + TimeDelta::minutes(3);
        assert_eq!(dev.since_last_change(later), TimeDelta::minutes(3));
        dev.mark_changed(later);
        assert_eq!(dev.last_changed, later);
    }

    #[test]
    fn should_report_supported_modes() {
        let dev = device(1, 1);
        assert!(dev.supports(SystemMode::Cooling));
        assert!(!dev.supports(SystemMode::Circulate));
    }

    #[test]
    fn should_reject_device_without_name() {
        let mut dev = device(1, 1);
        dev.name.clear();
        assert!(matches!(
            dev.validate(),
            Err(HvacError::Validation(ValidationError::EmptyName))
        ));
    }
}
