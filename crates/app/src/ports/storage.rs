//! Storage port — repository traits for the persisted store.
//!
//! The store is the single source of truth shared by every controller.
//! Multi-row changes (role swap, override set/clear) are one atomic
//! operation each.

use std::future::Future;

use hvac_domain::device::{AirHandler, Boiler, HeatPump, RadiantFloorLoop};
use hvac_domain::error::HvacError;
use hvac_domain::id::{SensorId, ZoneId};
use hvac_domain::mode::SystemMode;
use hvac_domain::sensor::Sensor;
use hvac_domain::system::SystemState;
use hvac_domain::time::Timestamp;
use hvac_domain::zone::Zone;

/// The system singleton.
pub trait SystemRepository: Send + Sync {
    fn get(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send;

    fn set_mode(&self, mode: SystemMode) -> impl Future<Output = Result<(), HvacError>> + Send;

    /// Remember the current mode as the prior mode, raise the override flag
    /// and switch to `mode`, atomically.
    fn set_override(
        &self,
        mode: SystemMode,
    ) -> impl Future<Output = Result<SystemState, HvacError>> + Send;

    /// Restore the prior mode (or `off`) and lower the override flag, atomically.
    fn clear_override(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send;

    fn set_recirculation(
        &self,
        active: bool,
        started_at: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;
}

pub trait ZoneRepository: Send + Sync {
    /// All zones, in configuration order.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, HvacError>> + Send;

    fn get_by_id(
        &self,
        id: &ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, HvacError>> + Send;

    fn update_mode(
        &self,
        id: &ZoneId,
        mode: SystemMode,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;

    fn update_setpoint(
        &self,
        id: &ZoneId,
        setpoint: f64,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;
}

/// Every relay-driven device, looked up by type.
pub trait DeviceRepository: Send + Sync {
    fn heat_pumps(&self) -> impl Future<Output = Result<Vec<HeatPump>, HvacError>> + Send;

    fn boilers(&self) -> impl Future<Output = Result<Vec<Boiler>, HvacError>> + Send;

    fn air_handlers(&self) -> impl Future<Output = Result<Vec<AirHandler>, HvacError>> + Send;

    fn radiant_loops(
        &self,
    ) -> impl Future<Output = Result<Vec<RadiantFloorLoop>, HvacError>> + Send;

    /// Flip `is_primary` on both heat pumps and stamp both with `now`, atomically.
    fn swap_primary_heat_pump(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;

    fn update_last_changed(
        &self,
        name: &str,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;

    fn set_online(
        &self,
        name: &str,
        online: bool,
    ) -> impl Future<Output = Result<(), HvacError>> + Send;

    fn air_handler_for_zone(
        &self,
        zone: &ZoneId,
    ) -> impl Future<Output = Result<Option<AirHandler>, HvacError>> + Send {
        async move {
            let handlers = self.air_handlers().await?;
            Ok(handlers.into_iter().find(|h| &h.zone_id == zone))
        }
    }

    fn radiant_loop_for_zone(
        &self,
        zone: &ZoneId,
    ) -> impl Future<Output = Result<Option<RadiantFloorLoop>, HvacError>> + Send {
        async move {
            let loops = self.radiant_loops().await?;
            Ok(loops.into_iter().find(|l| &l.zone_id == zone))
        }
    }
}

pub trait SensorRepository: Send + Sync {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Sensor>, HvacError>> + Send;

    fn get_by_id(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<Sensor>, HvacError>> + Send;
}

impl<T: SystemRepository> SystemRepository for std::sync::Arc<T> {
    fn get(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        (**self).get()
    }

    fn set_mode(&self, mode: SystemMode) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).set_mode(mode)
    }

    fn set_override(
        &self,
        mode: SystemMode,
    ) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        (**self).set_override(mode)
    }

    fn clear_override(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        (**self).clear_override()
    }

    fn set_recirculation(
        &self,
        active: bool,
        started_at: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).set_recirculation(active, started_at)
    }
}

impl<T: ZoneRepository> ZoneRepository for std::sync::Arc<T> {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, HvacError>> + Send {
        (**self).get_all()
    }

    fn get_by_id(
        &self,
        id: &ZoneId,
    ) -> impl Future<Output = Result<Option<Zone>, HvacError>> + Send {
        (**self).get_by_id(id)
    }

    fn update_mode(
        &self,
        id: &ZoneId,
        mode: SystemMode,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).update_mode(id, mode)
    }

    fn update_setpoint(
        &self,
        id: &ZoneId,
        setpoint: f64,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).update_setpoint(id, setpoint)
    }
}

impl<T: DeviceRepository> DeviceRepository for std::sync::Arc<T> {
    fn heat_pumps(&self) -> impl Future<Output = Result<Vec<HeatPump>, HvacError>> + Send {
        (**self).heat_pumps()
    }

    fn boilers(&self) -> impl Future<Output = Result<Vec<Boiler>, HvacError>> + Send {
        (**self).boilers()
    }

    fn air_handlers(&self) -> impl Future<Output = Result<Vec<AirHandler>, HvacError>> + Send {
        (**self).air_handlers()
    }

    fn radiant_loops(
        &self,
    ) -> impl Future<Output = Result<Vec<RadiantFloorLoop>, HvacError>> + Send {
        (**self).radiant_loops()
    }

    fn swap_primary_heat_pump(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).swap_primary_heat_pump(now)
    }

    fn update_last_changed(
        &self,
        name: &str,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).update_last_changed(name, at)
    }

    fn set_online(
        &self,
        name: &str,
        online: bool,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).set_online(name, online)
    }
}

impl<T: SensorRepository> SensorRepository for std::sync::Arc<T> {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Sensor>, HvacError>> + Send {
        (**self).get_all()
    }

    fn get_by_id(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<Sensor>, HvacError>> + Send {
        (**self).get_by_id(id)
    }
}
