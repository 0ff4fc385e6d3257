//! Periodic forced air movement for idle air handlers.

use chrono::TimeDelta;

use crate::mode::SystemMode;

/// How often idle air must be moved and for how long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecirculationPolicy {
    pub interval: TimeDelta,
    pub duration: TimeDelta,
}

impl Default for RecirculationPolicy {
    fn default() -> Self {
        Self {
            interval: TimeDelta::hours(12),
            duration: TimeDelta::minutes(15),
        }
    }
}

impl RecirculationPolicy {
    /// A recirculation flag older than this is considered stuck.
    #[must_use]
    pub fn watchdog_limit(&self) -> TimeDelta {
        self.duration * 2
    }
}

/// Sampled state of one air handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlowerState {
    pub blower_active: bool,
    pub pump_active: bool,
    pub since_last_change: TimeDelta,
    pub can_toggle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecirculationAction {
    None,
    /// Start the blower and raise the recirculation flag.
    StartBlower,
    /// Stop the blower. The flag drops once no other blower is forced on.
    StopBlower,
    /// Thermal demand owns the blower now.
    YieldToDemand,
    /// Circulation is wanted anyway.
    AlreadyCirculating,
}

/// Decide what recirculation should do with one air handler.
///
/// `zone_mode` is the owning zone's mode; a zone set to circulate keeps its
/// blower just like a system in circulate does.
#[must_use]
pub fn evaluate_recirculation(
    policy: &RecirculationPolicy,
    state: &BlowerState,
    system_mode: SystemMode,
    zone_mode: SystemMode,
) -> RecirculationAction {
    if !state.blower_active {
        if state.since_last_change > policy.interval && state.can_toggle {
            return RecirculationAction::StartBlower;
        }
        return RecirculationAction::None;
    }

    if state.pump_active {
        return RecirculationAction::YieldToDemand;
    }

    if system_mode == SystemMode::Circulate || zone_mode == SystemMode::Circulate {
        return RecirculationAction::AlreadyCirculating;
    }

    if state.since_last_change >= policy.duration && state.can_toggle {
        return RecirculationAction::StopBlower;
    }

    RecirculationAction::None
}
