//! Failsafe override — keep every zone inside absolute safety bounds.
//!
//! The failsafe scans zones in order; the first one outside
//! `[min_temp, max_temp]` forces the whole plant into heating or cooling.
//! The override is only released once every zone is comfortably inside the
//! narrower `[min_temp + spread, max_temp - spread]` band, so a zone
//! hovering at the edge cannot make the override flap.

use serde::{Deserialize, Serialize};

use crate::distribution::{AirHandlerStatus, LoopStatus, ZoneCommand};
use crate::id::ZoneId;
use crate::mode::SystemMode;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeSettings {
    pub min_temp: f64,
    pub max_temp: f64,
    pub spread: f64,
    /// Zones that neither trigger nor block an override.
    pub exempt_zones: Vec<String>,
}

impl Default for FailsafeSettings {
    fn default() -> Self {
        Self {
            min_temp: 50.0,
            max_temp: 85.0,
            spread: 2.0,
            exempt_zones: vec!["garage".to_string()],
        }
    }
}

impl FailsafeSettings {
    #[must_use]
    pub fn is_exempt(&self, zone: &ZoneId) -> bool {
        self.exempt_zones.iter().any(|z| z == zone.as_str())
    }
}

/// A zone with a trusted temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneTemperature {
    pub zone_id: ZoneId,
    pub temperature: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailsafeDecision {
    /// Nothing to do.
    Idle,
    /// Raise the override and drive the trigger zone toward `mode`.
    Engage {
        mode: SystemMode,
        zone_id: ZoneId,
        temperature: f64,
    },
    /// The override is up and a zone is still out of bounds.
    Hold,
    /// The override is up, no zone is out of bounds, but not all are safe.
    Settling,
    /// Lower the override and switch every zone's distributors off.
    Release,
}

/// Evaluate the failsafe for one cycle.
#[must_use]
pub fn evaluate_failsafe(
    settings: &FailsafeSettings,
    zones: &[ZoneTemperature],
    override_active: bool,
) -> FailsafeDecision {
    let monitored = || zones.iter().filter(|z| !settings.is_exempt(&z.zone_id));

    let violation = monitored().find_map(|z| {
        if z.temperature < settings.min_temp {
            Some((SystemMode::Heating, z))
        } else if z.temperature > settings.max_temp {
            Some((SystemMode::Cooling, z))
        } else {
            None
        }
    });

    match (violation, override_active) {
        (Some((mode, zone)), false) => FailsafeDecision::Engage {
            mode,
            zone_id: zone.zone_id.clone(),
            temperature: zone.temperature,
        },
        (Some(_), true) => FailsafeDecision::Hold,
        (None, false) => FailsafeDecision::Idle,
        (None, true) => {
            let safe_min = settings.min_temp + settings.spread;
            let safe_max = settings.max_temp - settings.spread;
            if monitored().all(|z| z.temperature >= safe_min && z.temperature <= safe_max) {
                FailsafeDecision::Release
            } else {
                FailsafeDecision::Settling
            }
        }
    }
}

/// Commands that drive a trigger zone toward the override mode.
///
/// The air handler serves both modes, the radiant loop heating only. Each
/// distributor still needs its own guard permission.
#[must_use]
pub fn override_commands(
    mode: SystemMode,
    air_handler: Option<AirHandlerStatus>,
    radiant_loop: Option<LoopStatus>,
) -> Vec<ZoneCommand> {
    let mut plan = Vec::new();
    if let Some(handler) = air_handler
        && handler.can_toggle
        && !(handler.blower_active && handler.pump_active)
    {
        plan.push(ZoneCommand::ActivateAirHandler);
    }
    if mode == SystemMode::Heating
        && let Some(radiant) = radiant_loop
        && radiant.can_toggle
        && !radiant.active
    {
        plan.push(ZoneCommand::ActivateLoop);
    }
    plan
}
