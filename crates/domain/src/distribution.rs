//! Zone distribution — choosing between radiant loop and air handler.
//!
//! The zone controller samples pin levels and guard results, then asks
//! [`plan_zone`] what to switch. The plan is a list of [`ZoneCommand`]s the
//! application layer executes in order.

use serde::Serialize;

use crate::error::ValidationError;
use crate::mode::{SystemMode, should_be_on};
use crate::zone::Zone;

/// Half-width of the zone hysteresis band, in °F.
pub const ZONE_SPREAD: f64 = 0.5;

/// How far below the primary band the backup air handler engages, in °F.
pub const BACKUP_HEAT_OFFSET: f64 = 3.0;

/// Zone threshold for a distributor in its current state.
///
/// `backup` selects the laxer band used for the air handler when a radiant
/// loop is the primary heat distributor. It only applies to heating.
#[must_use]
pub fn zone_threshold(setpoint: f64, mode: SystemMode, active: bool, backup: bool) -> f64 {
    match mode {
        SystemMode::Heating => {
            let offset = if backup { BACKUP_HEAT_OFFSET } else { 0.0 };
            if active {
                setpoint + ZONE_SPREAD - offset
            } else {
                setpoint - ZONE_SPREAD - offset
            }
        }
        _ => {
            if active {
                setpoint - ZONE_SPREAD
            } else {
                setpoint + ZONE_SPREAD
            }
        }
    }
}

/// Sampled state of a zone's air handler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AirHandlerStatus {
    pub blower_active: bool,
    pub pump_active: bool,
    pub can_toggle: bool,
}

/// Sampled state of a zone's radiant loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoopStatus {
    pub active: bool,
    pub can_toggle: bool,
}

/// Everything [`plan_zone`] needs besides the zone itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneSnapshot {
    pub system_mode: SystemMode,
    pub temperature: f64,
    pub air_handler: Option<AirHandlerStatus>,
    pub radiant_loop: Option<LoopStatus>,
    pub recirculating: bool,
}

/// A single switching step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneCommand {
    /// Circulation pump on, then blower on.
    ActivateAirHandler,
    /// Blower off, then circulation pump off.
    DeactivateAirHandler,
    ActivateBlower,
    DeactivateBlower,
    DeactivateCirculationPump,
    ActivateLoop,
    DeactivateLoop,
}

/// Decide what to switch for one zone this cycle.
///
/// Every command is already gated by the dwell-time guard, and blower
/// shutdowns are withheld while recirculation holds the blower.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the zone conflicts with the system
/// mode, has no distributor, or circulates without an air handler. The
/// caller should then apply [`precautionary_shutdown`].
pub fn plan_zone(zone: &Zone, snapshot: &ZoneSnapshot) -> Result<Vec<ZoneCommand>, ValidationError> {
    if zone.mode == SystemMode::Off {
        return Ok(precautionary_shutdown(snapshot));
    }

    if zone.mode.is_opposite(snapshot.system_mode) {
        return Err(ValidationError::OppositeMode {
            zone: zone.id.to_string(),
            zone_mode: zone.mode,
            system_mode: snapshot.system_mode,
        });
    }

    let mut plan = Vec::new();

    if zone.mode == SystemMode::Circulate {
        let Some(handler) = snapshot.air_handler else {
            return Err(ValidationError::CirculateWithoutAirHandler(zone.id.to_string()));
        };
        if handler.can_toggle {
            if !handler.blower_active {
                plan.push(ZoneCommand::ActivateBlower);
            } else if handler.pump_active {
                plan.push(ZoneCommand::DeactivateCirculationPump);
            }
        }
        return Ok(plan);
    }

    let heating = zone.mode == SystemMode::Heating;
    match (snapshot.air_handler, snapshot.radiant_loop) {
        (None, None) => return Err(ValidationError::NoDistributor(zone.id.to_string())),
        (None, Some(radiant)) => {
            if heating {
                follow_loop(&mut plan, zone, snapshot, radiant);
            }
        }
        (Some(handler), None) => follow_air_handler(&mut plan, zone, snapshot, handler, false),
        (Some(handler), Some(_)) if !heating => {
            follow_air_handler(&mut plan, zone, snapshot, handler, false);
        }
        (Some(handler), Some(radiant)) => {
            follow_loop(&mut plan, zone, snapshot, radiant);
            follow_air_handler(&mut plan, zone, snapshot, handler, true);
        }
    }

    Ok(plan)
}

fn follow_loop(plan: &mut Vec<ZoneCommand>, zone: &Zone, snapshot: &ZoneSnapshot, radiant: LoopStatus) {
    let threshold = zone_threshold(zone.setpoint, zone.mode, radiant.active, false);
    let should = should_be_on(snapshot.temperature, threshold, zone.mode);
    if should == radiant.active || !radiant.can_toggle {
        return;
    }
    plan.push(if should {
        ZoneCommand::ActivateLoop
    } else {
        ZoneCommand::DeactivateLoop
    });
}

fn follow_air_handler(
    plan: &mut Vec<ZoneCommand>,
    zone: &Zone,
    snapshot: &ZoneSnapshot,
    handler: AirHandlerStatus,
    backup: bool,
) {
    let threshold = zone_threshold(zone.setpoint, zone.mode, handler.pump_active, backup);
    let should = should_be_on(snapshot.temperature, threshold, zone.mode);
    if should == handler.pump_active || !handler.can_toggle {
        return;
    }
    if should {
        plan.push(ZoneCommand::ActivateAirHandler);
    } else if snapshot.recirculating {
        plan.push(ZoneCommand::DeactivateCirculationPump);
    } else {
        plan.push(ZoneCommand::DeactivateAirHandler);
    }
}

/// Switch every active distributor of a zone off, guard permitting.
///
/// The blower is left alone while recirculation holds it.
#[must_use]
pub fn precautionary_shutdown(snapshot: &ZoneSnapshot) -> Vec<ZoneCommand> {
    shutdown_commands(
        snapshot.air_handler,
        snapshot.radiant_loop,
        snapshot.recirculating,
    )
}

/// [`precautionary_shutdown`] for callers without a temperature at hand.
#[must_use]
pub fn shutdown_commands(
    air_handler: Option<AirHandlerStatus>,
    radiant_loop: Option<LoopStatus>,
    recirculating: bool,
) -> Vec<ZoneCommand> {
    let mut plan = Vec::new();
    if let Some(handler) = air_handler.filter(|h| h.can_toggle) {
        let stop_blower = handler.blower_active && !recirculating;
        match (stop_blower, handler.pump_active) {
            (true, true) => plan.push(ZoneCommand::DeactivateAirHandler),
            (true, false) => plan.push(ZoneCommand::DeactivateBlower),
            (false, true) => plan.push(ZoneCommand::DeactivateCirculationPump),
            (false, false) => {}
        }
    }
    if let Some(radiant) = radiant_loop
        && radiant.active
        && radiant.can_toggle
    {
        plan.push(ZoneCommand::DeactivateLoop);
    }
    plan
}
