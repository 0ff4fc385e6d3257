//! Zone — a thermostat-controlled area of the house.

use serde::{Deserialize, Serialize};

use crate::error::{HvacError, ValidationError};
use crate::id::{SensorId, ZoneId};
use crate::mode::SystemMode;

/// A controlled area with its own setpoint, mode and sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub label: String,
    pub setpoint: f64,
    pub mode: SystemMode,
    pub capabilities: Vec<SystemMode>,
    pub sensor_id: SensorId,
}

impl Zone {
    /// Create a builder for constructing a [`Zone`].
    #[must_use]
    pub fn builder() -> ZoneBuilder {
        ZoneBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HvacError::Validation`] when the label is empty or the
    /// current mode is not one the zone supports.
    pub fn validate(&self) -> Result<(), HvacError> {
        if self.label.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if !self.supports(self.mode) {
            return Err(ValidationError::UnsupportedZoneMode {
                zone: self.id.to_string(),
                mode: self.mode,
            }
            .into());
        }
        Ok(())
    }

    /// `off` is always supported; anything else must be a listed capability.
    #[must_use]
    pub fn supports(&self, mode: SystemMode) -> bool {
        mode == SystemMode::Off || self.capabilities.contains(&mode)
    }
}

/// Step-by-step builder for [`Zone`].
#[derive(Debug, Default)]
pub struct ZoneBuilder {
    id: Option<ZoneId>,
    label: Option<String>,
    setpoint: Option<f64>,
    mode: Option<SystemMode>,
    capabilities: Vec<SystemMode>,
    sensor_id: Option<SensorId>,
}

impl ZoneBuilder {
    #[must_use]
    pub fn id(mut self, id: ZoneId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn setpoint(mut self, setpoint: f64) -> Self {
        self.setpoint = Some(setpoint);
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: SystemMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn capability(mut self, mode: SystemMode) -> Self {
        if !self.capabilities.contains(&mode) {
            self.capabilities.push(mode);
        }
        self
    }

    #[must_use]
    pub fn sensor_id(mut self, sensor_id: SensorId) -> Self {
        self.sensor_id = Some(sensor_id);
        self
    }

    /// Consume the builder, validate, and return a [`Zone`].
    ///
    /// The sensor defaults to one named after the zone.
    ///
    /// # Errors
    ///
    /// Returns [`HvacError::Validation`] if the id or label is missing, or
    /// the mode is unsupported.
    pub fn build(self) -> Result<Zone, HvacError> {
        let id = self
            .id
            .ok_or_else(|| ValidationError::InvalidId(String::new()))?;
        let sensor_id = match self.sensor_id {
            Some(sensor_id) => sensor_id,
            None => SensorId::new(id.as_str())?,
        };
        let zone = Zone {
            id,
            label: self.label.unwrap_or_default(),
            setpoint: self.setpoint.unwrap_or(68.0),
            mode: self.mode.unwrap_or_default(),
            capabilities: self.capabilities,
            sensor_id,
        };
        zone.validate()?;
        Ok(zone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_id(s: &str) -> ZoneId {
        ZoneId::new(s).unwrap()
    }

    #[test]
    fn should_build_zone_with_defaults() {
        let zone = Zone::builder()
            .id(zone_id("basement"))
            .label("Basement")
            .capability(SystemMode::Heating)
            .build()
            .unwrap();

        assert_eq!(zone.mode, SystemMode::Off);
        assert_eq!(zone.sensor_id.as_str(), "basement");
        assert!((zone.setpoint - 68.0).abs() < f64::EPSILON);
    }

    #[test]
    fn should_reject_zone_without_label() {
        let result = Zone::builder().id(zone_id("basement")).build();
        assert!(matches!(
            result,
            Err(HvacError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_reject_unsupported_mode() {
        let result = Zone::builder()
            .id(zone_id("garage"))
            .label("Garage")
            .capability(SystemMode::Heating)
            .mode(SystemMode::Cooling)
            .build();
        assert!(matches!(
            result,
            Err(HvacError::Validation(ValidationError::UnsupportedZoneMode { .. }))
        ));
    }

    #[test]
    fn should_always_support_off() {
        let zone = Zone::builder()
            .id(zone_id("garage"))
            .label("Garage")
            .build()
            .unwrap();
        assert!(zone.supports(SystemMode::Off));
        assert!(!zone.supports(SystemMode::Heating));
    }

    #[test]
    fn should_not_duplicate_capabilities() {
        let zone = Zone::builder()
            .id(zone_id("main_floor"))
            .label("Main Floor")
            .capability(SystemMode::Heating)
            .capability(SystemMode::Heating)
            .build()
            .unwrap();
        assert_eq!(zone.capabilities, vec![SystemMode::Heating]);
    }

    #[test]
    fn should_roundtrip_through_serde_json() {
        let zone = Zone::builder()
            .id(zone_id("main_floor"))
            .label("Main Floor")
            .capability(SystemMode::Cooling)
            .mode(SystemMode::Cooling)
            .setpoint(72.5)
            .build()
            .unwrap();
        let json = serde_json::to_string(&zone).unwrap();
        let parsed: Zone = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, zone);
    }
}
