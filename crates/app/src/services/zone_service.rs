//! Zone service — status and command use-cases for individual zones.

use hvac_domain::error::{HvacError, NotFoundError, ValidationError};
use hvac_domain::id::ZoneId;
use hvac_domain::mode::SystemMode;
use hvac_domain::zone::Zone;

use crate::ports::{DeviceRepository, TemperatureSource, ZoneRepository};

/// Range a user-supplied setpoint must fall in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneLimits {
    pub min_setpoint: f64,
    pub max_setpoint: f64,
}

impl Default for ZoneLimits {
    fn default() -> Self {
        Self {
            min_setpoint: 55.0,
            max_setpoint: 85.0,
        }
    }
}

/// A zone together with its latest trusted temperature.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneStatus {
    pub zone: Zone,
    pub temperature: Option<f64>,
}

pub struct ZoneService<Z, D, T> {
    zones: Z,
    devices: D,
    temperatures: T,
    limits: ZoneLimits,
}

impl<Z, D, T> ZoneService<Z, D, T>
where
    Z: ZoneRepository,
    D: DeviceRepository,
    T: TemperatureSource,
{
    pub fn new(zones: Z, devices: D, temperatures: T, limits: ZoneLimits) -> Self {
        Self {
            zones,
            devices,
            temperatures,
            limits,
        }
    }

    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_zones(&self) -> Result<Vec<ZoneStatus>, HvacError> {
        let zones = self.zones.get_all().await?;
        Ok(zones.into_iter().map(|zone| self.status(zone)).collect())
    }

    /// # Errors
    ///
    /// Returns [`HvacError::NotFound`] when no zone with `id` exists, or a
    /// storage error from the repository.
    pub async fn get_zone(&self, id: &ZoneId) -> Result<ZoneStatus, HvacError> {
        let zone = self.find(id).await?;
        Ok(self.status(zone))
    }

    /// Change a zone's mode.
    ///
    /// `off` is always accepted. Anything else must be among the zone's
    /// capabilities, and `circulate` needs an air handler.
    ///
    /// # Errors
    ///
    /// Returns [`HvacError::Validation`] for a mode the zone cannot run,
    /// [`HvacError::NotFound`] for an unknown zone, or a storage error.
    pub async fn set_mode(&self, id: &ZoneId, mode: SystemMode) -> Result<ZoneStatus, HvacError> {
        let mut zone = self.find(id).await?;
        if !zone.supports(mode) {
            return Err(ValidationError::UnsupportedZoneMode {
                zone: zone.id.to_string(),
                mode,
            }
            .into());
        }
        if mode == SystemMode::Circulate && self.devices.air_handler_for_zone(id).await?.is_none() {
            return Err(ValidationError::CirculateWithoutAirHandler(zone.id.to_string()).into());
        }

        self.zones.update_mode(id, mode).await?;
        tracing::info!(zone = %id, from = %zone.mode, to = %mode, "zone mode changed");
        zone.mode = mode;
        Ok(self.status(zone))
    }

    /// Change a zone's setpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SetpointOutOfRange`] outside the configured
    /// limits, [`HvacError::NotFound`] for an unknown zone, or a storage error.
    pub async fn set_setpoint(&self, id: &ZoneId, setpoint: f64) -> Result<ZoneStatus, HvacError> {
        let ZoneLimits {
            min_setpoint: min,
            max_setpoint: max,
        } = self.limits;
        if !(min..=max).contains(&setpoint) {
            return Err(ValidationError::SetpointOutOfRange {
                value: setpoint,
                min,
                max,
            }
            .into());
        }

        let mut zone = self.find(id).await?;
        self.zones.update_setpoint(id, setpoint).await?;
        tracing::info!(zone = %id, from = zone.setpoint, to = setpoint, "zone setpoint changed");
        zone.setpoint = setpoint;
        Ok(self.status(zone))
    }

    async fn find(&self, id: &ZoneId) -> Result<Zone, HvacError> {
        self.zones.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Zone",
                id: id.to_string(),
            }
            .into()
        })
    }

    fn status(&self, zone: Zone) -> ZoneStatus {
        let temperature = self.temperatures.temperature(&zone.sensor_id);
        ZoneStatus { zone, temperature }
    }
}
