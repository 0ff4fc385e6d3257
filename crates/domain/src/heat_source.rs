//! Buffer-tank heat sources: role selection, rotation and hysteresis.
//!
//! Up to three sources feed the buffer tank. Two heat pumps share the
//! primary and secondary roles and swap them on a fixed rotation interval so
//! wear is balanced; the boiler is a heating-only tertiary backup. Each role
//! gets its own on/off threshold pair, offset from the base thresholds by a
//! role margin and separated from each other by `spread`.

use std::fmt;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::device::{Boiler, Device, HeatPump};
use crate::error::FatalError;
use crate::mode::{SystemMode, should_be_on};
use crate::time::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Primary,
    Secondary,
    Tertiary,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
            Self::Tertiary => "tertiary",
        })
    }
}

/// Base thresholds and role margins, all in °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSettings {
    pub heating_threshold: f64,
    pub cooling_threshold: f64,
    pub spread: f64,
    pub secondary_margin: f64,
    pub tertiary_margin: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            heating_threshold: 110.0,
            cooling_threshold: 50.0,
            spread: 5.0,
            secondary_margin: 5.0,
            tertiary_margin: 10.0,
        }
    }
}

impl ThresholdSettings {
    fn margin(&self, role: Role) -> f64 {
        match role {
            Role::Primary => 0.0,
            Role::Secondary => self.secondary_margin,
            Role::Tertiary => self.tertiary_margin,
        }
    }

    /// Temperature that switches an idle source on.
    ///
    /// Returns `None` for modes without thermal demand.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::TertiaryInCooling`] for the boiler in cooling.
    pub fn on_threshold(&self, mode: SystemMode, role: Role) -> Result<Option<f64>, FatalError> {
        match mode {
            SystemMode::Heating => Ok(Some(self.heating_threshold - self.margin(role))),
            SystemMode::Cooling if role == Role::Tertiary => Err(FatalError::TertiaryInCooling),
            SystemMode::Cooling => Ok(Some(self.cooling_threshold + self.margin(role))),
            SystemMode::Off | SystemMode::Circulate => Ok(None),
        }
    }

    /// Temperature that switches a running source off.
    ///
    /// Always `spread` past the on threshold, on the overshoot side.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::TertiaryInCooling`] for the boiler in cooling.
    pub fn off_threshold(&self, mode: SystemMode, role: Role) -> Result<Option<f64>, FatalError> {
        let on = self.on_threshold(mode, role)?;
        Ok(on.map(|on| match mode {
            SystemMode::Cooling => on - self.spread,
            _ => on + self.spread,
        }))
    }

    /// The threshold that applies given the source's current state.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::TertiaryInCooling`] for the boiler in cooling.
    pub fn threshold(
        &self,
        mode: SystemMode,
        role: Role,
        currently_active: bool,
    ) -> Result<Option<f64>, FatalError> {
        if currently_active {
            self.off_threshold(mode, role)
        } else {
            self.on_threshold(mode, role)
        }
    }
}

/// What to do with one source this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAction {
    /// Already in the wanted state.
    Keep,
    Activate,
    Deactivate,
    /// A change is wanted but the dwell-time guard forbids it.
    Blocked,
}

/// Outcome of evaluating one source against the buffer temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceEvaluation {
    pub threshold: Option<f64>,
    pub should_be_on: bool,
    pub action: SourceAction,
}

/// Evaluate a single source.
///
/// The dwell-time guard is only consulted when a change is wanted.
///
/// # Errors
///
/// Returns [`FatalError::TertiaryInCooling`] for the boiler in cooling.
pub fn evaluate_source(
    settings: &ThresholdSettings,
    role: Role,
    mode: SystemMode,
    buffer_temp: f64,
    device: &Device,
    currently_active: bool,
    now: Timestamp,
) -> Result<SourceEvaluation, FatalError> {
    let threshold = settings.threshold(mode, role, currently_active)?;
    let should = threshold.is_some_and(|threshold| should_be_on(buffer_temp, threshold, mode));

    let action = if should == currently_active {
        SourceAction::Keep
    } else if !device.can_toggle(currently_active, now) {
        SourceAction::Blocked
    } else if should {
        SourceAction::Activate
    } else {
        SourceAction::Deactivate
    };

    Ok(SourceEvaluation {
        threshold,
        should_be_on: should,
        action,
    })
}

/// The sources offered for this cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeatSources {
    pub primary: Option<HeatPump>,
    pub secondary: Option<HeatPump>,
    pub tertiary: Option<Boiler>,
    /// Roles were swapped this cycle and must be persisted.
    pub rotated: bool,
}

/// Pick primary, secondary and tertiary sources from the stored devices.
///
/// Roles are swapped (and both rotation stamps reset to `now`) when both
/// pumps are online and the primary has held its role for longer than
/// `rotation_interval`. A single online pump becomes the sole source.
///
/// # Errors
///
/// Returns [`FatalError::NoPrimaryHeatPump`] or
/// [`FatalError::MultiplePrimaryHeatPumps`] when heat pumps exist but the
/// primary flag is not held by exactly one of them.
pub fn select_sources(
    heat_pumps: Vec<HeatPump>,
    boilers: Vec<Boiler>,
    mode: SystemMode,
    now: Timestamp,
    rotation_interval: TimeDelta,
) -> Result<HeatSources, FatalError> {
    let mut sources = HeatSources::default();

    if !heat_pumps.is_empty() {
        let primaries = heat_pumps.iter().filter(|hp| hp.is_primary).count();
        match primaries {
            0 => return Err(FatalError::NoPrimaryHeatPump),
            1 => {}
            n => return Err(FatalError::MultiplePrimaryHeatPumps(n)),
        }

        let (primary, secondary): (Vec<_>, Vec<_>) =
            heat_pumps.into_iter().partition(|hp| hp.is_primary);

        match (primary.into_iter().next(), secondary.into_iter().next()) {
            (Some(mut p), Some(mut s)) if p.device.online && s.device.online => {
                if now - p.last_rotated > rotation_interval {
                    p.is_primary = false;
                    s.is_primary = true;
                    p.last_rotated = now;
                    s.last_rotated = now;
                    std::mem::swap(&mut p, &mut s);
                    sources.rotated = true;
                }
                sources.primary = Some(p);
                sources.secondary = Some(s);
            }
            (Some(p), _) if p.device.online => sources.primary = Some(p),
            (_, Some(s)) if s.device.online => sources.primary = Some(s),
            _ => {}
        }
    }

    if mode != SystemMode::Cooling {
        sources.tertiary = boilers.into_iter().find(|b| b.device.online);
    }

    Ok(sources)
}

/// What to do with a heat pump's mode-select pin this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModePinAction {
    Aligned,
    SwitchToCooling,
    SwitchToHeating,
    /// The compressor is running and must be stopped before switching.
    StopPumpFirst,
    /// The compressor is running and may not be stopped yet.
    Wait,
}

/// Align a heat pump's mode pin (active = cooling) with the system mode.
///
/// Offline pumps are never switched into cooling, but are always allowed
/// back out of it.
#[must_use]
pub fn mode_pin_action(
    system_mode: SystemMode,
    mode_pin_active: bool,
    pump_active: bool,
    online: bool,
    can_toggle_pump: bool,
) -> ModePinAction {
    let from_cooling = mode_pin_active && system_mode != SystemMode::Cooling;
    let to_cooling = !mode_pin_active && system_mode == SystemMode::Cooling && online;

    if !(from_cooling || to_cooling) {
        return ModePinAction::Aligned;
    }
    if pump_active {
        return if can_toggle_pump {
            ModePinAction::StopPumpFirst
        } else {
            ModePinAction::Wait
        };
    }
    if to_cooling {
        ModePinAction::SwitchToCooling
    } else {
        ModePinAction::SwitchToHeating
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::GpioPin;
    use chrono::TimeZone;

    fn t0() -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn settings() -> ThresholdSettings {
        ThresholdSettings {
            heating_threshold: 110.0,
            cooling_threshold: 50.0,
            spread: 4.0,
            secondary_margin: 5.0,
            tertiary_margin: 10.0,
        }
    }

    fn device(name: &str, pin: u8, last_changed: Timestamp) -> Device {
        Device {
            name: name.to_string(),
            pin: GpioPin::new(pin, true),
            min_on: TimeDelta::minutes(10),
            min_off: TimeDelta::minutes(10),
            online: true,
            last_changed,
            active_modes: vec![SystemMode::Heating, SystemMode::Cooling],
        }
    }

    fn heat_pump(name: &str, pin: u8, primary: bool, last_rotated: Timestamp) -> HeatPump {
        HeatPump {
            device: device(name, pin, t0()),
            mode_pin: GpioPin::new(pin + 1, true),
            is_primary: primary,
            last_rotated,
        }
    }

    fn boiler() -> Boiler {
        Boiler {
            device: device("boiler", 30, t0()),
        }
    }

    #[test]
    fn should_offset_heating_thresholds_by_role_margin() {
        let s = settings();
        assert_eq!(s.on_threshold(SystemMode::Heating, Role::Primary), Ok(Some(110.0)));
        assert_eq!(s.on_threshold(SystemMode::Heating, Role::Secondary), Ok(Some(105.0)));
        assert_eq!(s.on_threshold(SystemMode::Heating, Role::Tertiary), Ok(Some(100.0)));
        assert_eq!(s.off_threshold(SystemMode::Heating, Role::Tertiary), Ok(Some(104.0)));
    }

    #[test]
    fn should_offset_cooling_thresholds_by_role_margin() {
        let s = settings();
        assert_eq!(s.on_threshold(SystemMode::Cooling, Role::Primary), Ok(Some(50.0)));
        assert_eq!(s.off_threshold(SystemMode::Cooling, Role::Primary), Ok(Some(46.0)));
        assert_eq!(s.on_threshold(SystemMode::Cooling, Role::Secondary), Ok(Some(55.0)));
        assert_eq!(s.off_threshold(SystemMode::Cooling, Role::Secondary), Ok(Some(51.0)));
    }

    #[test]
    fn should_separate_on_and_off_by_spread_in_overshoot_direction() {
        let s = settings();
        for role in [Role::Primary, Role::Secondary, Role::Tertiary] {
            let on = s.on_threshold(SystemMode::Heating, role).unwrap().unwrap();
            let off = s.off_threshold(SystemMode::Heating, role).unwrap().unwrap();
            assert!((off - on - s.spread).abs() < 1e-9);
        }
        for role in [Role::Primary, Role::Secondary] {
            let on = s.on_threshold(SystemMode::Cooling, role).unwrap().unwrap();
            let off = s.off_threshold(SystemMode::Cooling, role).unwrap().unwrap();
            assert!((on - off - s.spread).abs() < 1e-9);
        }
    }

    #[test]
    fn should_fail_for_tertiary_in_cooling() {
        assert_eq!(
            settings().threshold(SystemMode::Cooling, Role::Tertiary, false),
            Err(FatalError::TertiaryInCooling)
        );
    }

    #[test]
    fn should_have_no_threshold_when_off_or_circulating() {
        let s = settings();
        assert_eq!(s.threshold(SystemMode::Off, Role::Tertiary, true), Ok(None));
        assert_eq!(s.threshold(SystemMode::Circulate, Role::Primary, false), Ok(None));
    }

    #[test]
    fn should_activate_idle_primary_below_on_threshold() {
        let dev = device("hp1", 17, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Primary,
            SystemMode::Heating,
            109.0,
            &dev,
            false,
            t0() + TimeDelta::minutes(11),
        )
        .unwrap();
        assert_eq!(eval.action, SourceAction::Activate);
        assert_eq!(eval.threshold, Some(110.0));
    }

    #[test]
    fn should_keep_running_primary_inside_hysteresis_band() {
        let dev = device("hp1", 17, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Primary,
            SystemMode::Heating,
            112.0,
            &dev,
            true,
            t0() + TimeDelta::minutes(60),
        )
        .unwrap();
        assert_eq!(eval.threshold, Some(114.0));
        assert_eq!(eval.action, SourceAction::Keep);
    }

    #[test]
    fn should_deactivate_running_primary_past_off_threshold() {
        let dev = device("hp1", 17, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Primary,
            SystemMode::Heating,
            114.5,
            &dev,
            true,
            t0() + TimeDelta::minutes(60),
        )
        .unwrap();
        assert_eq!(eval.action, SourceAction::Deactivate);
    }

    #[test]
    fn should_block_change_when_guard_denies() {
        let dev = device("hp1", 17, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Primary,
            SystemMode::Heating,
            100.0,
            &dev,
            false,
            t0() + TimeDelta::minutes(2),
        )
        .unwrap();
        assert!(eval.should_be_on);
        assert_eq!(eval.action, SourceAction::Blocked);
    }

    #[test]
    fn should_switch_running_source_off_when_system_off() {
        let dev = device("boiler", 30, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Tertiary,
            SystemMode::Off,
            60.0,
            &dev,
            true,
            t0() + TimeDelta::minutes(60),
        )
        .unwrap();
        assert_eq!(eval.action, SourceAction::Deactivate);
    }

    #[test]
    fn should_activate_primary_above_cooling_threshold() {
        let dev = device("hp1", 17, t0());
        let eval = evaluate_source(
            &settings(),
            Role::Primary,
            SystemMode::Cooling,
            51.0,
            &dev,
            false,
            t0() + TimeDelta::minutes(60),
        )
        .unwrap();
        assert_eq!(eval.action, SourceAction::Activate);
    }

    #[test]
    fn should_fail_when_no_heat_pump_is_primary() {
        let pumps = vec![
            heat_pump("hp1", 17, false, t0()),
            heat_pump("hp2", 22, false, t0()),
        ];
        let result = select_sources(pumps, vec![], SystemMode::Heating, t0(), TimeDelta::hours(24));
        assert_eq!(result, Err(FatalError::NoPrimaryHeatPump));
    }

    #[test]
    fn should_fail_when_multiple_heat_pumps_are_primary() {
        let pumps = vec![
            heat_pump("hp1", 17, true, t0()),
            heat_pump("hp2", 22, true, t0()),
        ];
        let result = select_sources(pumps, vec![], SystemMode::Heating, t0(), TimeDelta::hours(24));
        assert_eq!(result, Err(FatalError::MultiplePrimaryHeatPumps(2)));
    }

    #[test]
    fn should_keep_roles_before_rotation_interval() {
        let pumps = vec![
            heat_pump("hp1", 17, true, t0()),
            heat_pump("hp2", 22, false, t0()),
        ];
        let now = t0() + TimeDelta::hours(24);
        let sources =
            select_sources(pumps, vec![boiler()], SystemMode::Heating, now, TimeDelta::hours(24))
                .unwrap();
        assert!(!sources.rotated);
        assert_eq!(sources.primary.unwrap().device.name, "hp1");
        assert_eq!(sources.secondary.unwrap().device.name, "hp2");
        assert!(sources.tertiary.is_some());
    }

    #[test]
    fn should_rotate_roles_after_interval_when_both_online() {
        let pumps = vec![
            heat_pump("hp1", 17, true, t0()),
            heat_pump("hp2", 22, false, t0()),
        ];
        let now = t0() + TimeDelta::hours(25);
        let sources =
            select_sources(pumps, vec![], SystemMode::Heating, now, TimeDelta::hours(24)).unwrap();
        assert!(sources.rotated);
        let primary = sources.primary.unwrap();
        let secondary = sources.secondary.unwrap();
        assert_eq!(primary.device.name, "hp2");
        assert!(primary.is_primary);
        assert_eq!(primary.last_rotated, now);
        assert_eq!(secondary.device.name, "hp1");
        assert!(!secondary.is_primary);
        assert_eq!(secondary.last_rotated, now);
    }

    #[test]
    fn should_promote_online_secondary_when_primary_offline() {
        let mut hp1 = heat_pump("hp1", 17, true, t0());
        hp1.device.online = false;
        let pumps = vec![hp1, heat_pump("hp2", 22, false, t0())];
        let sources = select_sources(
            pumps,
            vec![],
            SystemMode::Heating,
            t0() + TimeDelta::days(10),
            TimeDelta::hours(24),
        )
        .unwrap();
        assert!(!sources.rotated);
        assert_eq!(sources.primary.unwrap().device.name, "hp2");
        assert!(sources.secondary.is_none());
    }

    #[test]
    fn should_offer_sole_primary_when_secondary_offline() {
        let mut hp2 = heat_pump("hp2", 22, false, t0());
        hp2.device.online = false;
        let pumps = vec![heat_pump("hp1", 17, true, t0()), hp2];
        let sources =
            select_sources(pumps, vec![], SystemMode::Heating, t0(), TimeDelta::hours(24)).unwrap();
        assert_eq!(sources.primary.unwrap().device.name, "hp1");
        assert!(sources.secondary.is_none());
    }

    #[test]
    fn should_offer_no_heat_pump_when_both_offline() {
        let mut hp1 = heat_pump("hp1", 17, true, t0());
        let mut hp2 = heat_pump("hp2", 22, false, t0());
        hp1.device.online = false;
        hp2.device.online = false;
        let sources = select_sources(
            vec![hp1, hp2],
            vec![boiler()],
            SystemMode::Heating,
            t0(),
            TimeDelta::hours(24),
        )
        .unwrap();
        assert!(sources.primary.is_none());
        assert!(sources.secondary.is_none());
        assert!(sources.tertiary.is_some());
    }

    #[test]
    fn should_never_offer_boiler_in_cooling() {
        let pumps = vec![
            heat_pump("hp1", 17, true, t0()),
            heat_pump("hp2", 22, false, t0()),
        ];
        let sources = select_sources(
            pumps,
            vec![boiler()],
            SystemMode::Cooling,
            t0(),
            TimeDelta::hours(24),
        )
        .unwrap();
        assert!(sources.tertiary.is_none());
    }

    #[test]
    fn should_skip_offline_boiler() {
        let mut b = boiler();
        b.device.online = false;
        let sources =
            select_sources(vec![], vec![b], SystemMode::Heating, t0(), TimeDelta::hours(24))
                .unwrap();
        assert!(sources.tertiary.is_none());
    }

    #[test]
    fn should_leave_aligned_mode_pin_alone() {
        assert_eq!(
            mode_pin_action(SystemMode::Heating, false, true, true, true),
            ModePinAction::Aligned
        );
        assert_eq!(
            mode_pin_action(SystemMode::Cooling, true, true, true, true),
            ModePinAction::Aligned
        );
    }

    #[test]
    fn should_not_switch_offline_pump_into_cooling() {
        assert_eq!(
            mode_pin_action(SystemMode::Cooling, false, false, false, true),
            ModePinAction::Aligned
        );
    }

    #[test]
    fn should_switch_offline_pump_out_of_cooling() {
        assert_eq!(
            mode_pin_action(SystemMode::Off, true, false, false, true),
            ModePinAction::SwitchToHeating
        );
    }

    #[test]
    fn should_stop_running_pump_before_switching_mode() {
        assert_eq!(
            mode_pin_action(SystemMode::Cooling, false, true, true, true),
            ModePinAction::StopPumpFirst
        );
        assert_eq!(
            mode_pin_action(SystemMode::Cooling, false, true, true, false),
            ModePinAction::Wait
        );
    }

    #[test]
    fn should_switch_idle_pump_into_cooling() {
        assert_eq!(
            mode_pin_action(SystemMode::Cooling, false, false, true, false),
            ModePinAction::SwitchToCooling
        );
    }
}
