//! Operating modes shared by the system singleton and every zone.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// What the plant (or a zone) is currently asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    #[default]
    Off,
    Heating,
    Cooling,
    Circulate,
}

impl SystemMode {
    /// All modes, in declaration order.
    pub const ALL: [Self; 4] = [Self::Off, Self::Heating, Self::Cooling, Self::Circulate];

    /// Stable lowercase name, as stored and exposed over the API.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Heating => "heating",
            Self::Cooling => "cooling",
            Self::Circulate => "circulate",
        }
    }

    /// Heating versus cooling conflict. Off and circulate never conflict.
    #[must_use]
    pub fn is_opposite(self, other: Self) -> bool {
        matches!(
            (self, other),
            (Self::Heating, Self::Cooling) | (Self::Cooling, Self::Heating)
        )
    }

    /// Whether the mode moves heat (heating or cooling).
    #[must_use]
    pub fn is_thermal(self) -> bool {
        matches!(self, Self::Heating | Self::Cooling)
    }
}

impl fmt::Display for SystemMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SystemMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownMode(s.to_string()))
    }
}

/// `temp` is on the demanding side of `threshold` for `mode`.
///
/// Heating demands below the threshold, cooling above it. Any other mode
/// never demands.
#[must_use]
pub fn should_be_on(temp: f64, threshold: f64, mode: SystemMode) -> bool {
    match mode {
        SystemMode::Heating => temp < threshold,
        SystemMode::Cooling => temp > threshold,
        SystemMode::Off | SystemMode::Circulate => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_every_mode_from_its_name() {
        for mode in SystemMode::ALL {
            assert_eq!(mode.as_str().parse::<SystemMode>().unwrap(), mode);
        }
    }

    #[test]
    fn should_reject_unknown_mode() {
        assert_eq!(
            "turbo".parse::<SystemMode>(),
            Err(ValidationError::UnknownMode("turbo".to_string()))
        );
    }

    #[test]
    fn should_only_treat_heating_and_cooling_as_opposite() {
        assert!(SystemMode::Heating.is_opposite(SystemMode::Cooling));
        assert!(SystemMode::Cooling.is_opposite(SystemMode::Heating));
        assert!(!SystemMode::Heating.is_opposite(SystemMode::Heating));
        assert!(!SystemMode::Circulate.is_opposite(SystemMode::Cooling));
        assert!(!SystemMode::Off.is_opposite(SystemMode::Heating));
    }

    #[test]
    fn should_demand_below_threshold_when_heating() {
        assert!(should_be_on(99.0, 100.0, SystemMode::Heating));
        assert!(!should_be_on(100.0, 100.0, SystemMode::Heating));
    }

    #[test]
    fn should_demand_above_threshold_when_cooling() {
        assert!(should_be_on(51.0, 50.0, SystemMode::Cooling));
        assert!(!should_be_on(50.0, 50.0, SystemMode::Cooling));
    }

    #[test]
    fn should_never_demand_when_off_or_circulating() {
        assert!(!should_be_on(-40.0, 100.0, SystemMode::Off));
        assert!(!should_be_on(200.0, 100.0, SystemMode::Circulate));
    }

    #[test]
    fn should_serialize_as_snake_case() {
        let json = serde_json::to_string(&SystemMode::Circulate).unwrap();
        assert_eq!(json, "\"circulate\"");
    }
}
