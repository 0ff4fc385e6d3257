//! In-memory ports shared by the unit tests of this crate.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use chrono::TimeDelta;

use hvac_domain::device::{AirHandler, Boiler, Device, HeatPump, RadiantFloorLoop};
use hvac_domain::error::HvacError;
use hvac_domain::id::{SensorId, ZoneId};
use hvac_domain::mode::SystemMode;
use hvac_domain::pin::GpioPin;
use hvac_domain::sensor::Sensor;
use hvac_domain::system::SystemState;
use hvac_domain::time::{Timestamp, now};
use hvac_domain::zone::Zone;

use crate::ports::{
    DeviceRepository, MetricsSink, Notifier, PinDriver, PowerControl, SensorReader, SensorRepository,
    SystemRepository, TemperatureSource, ZoneRepository,
};

pub fn zone(id: &str) -> ZoneId {
    ZoneId::new(id).unwrap()
}

pub fn sensor(id: &str) -> SensorId {
    SensorId::new(id).unwrap()
}

/// A device that last switched an hour ago, with five-minute dwell times.
pub fn device(name: &str, pin: u8) -> Device {
    Device {
        name: name.to_string(),
        pin: GpioPin::new(pin, true),
        min_on: TimeDelta::minutes(5),
        min_off: TimeDelta::minutes(5),
        online: true,
        last_changed: now() - TimeDelta::hours(1),
        active_modes: vec![SystemMode::Heating, SystemMode::Cooling],
    }
}

/// Pin levels keyed by pin number; unknown pins read low.
#[derive(Default)]
pub struct FakePins {
    pub levels: Mutex<HashMap<u8, bool>>,
}

impl FakePins {
    pub fn set_active(&self, pin: GpioPin, active: bool) {
        self.levels
            .lock()
            .unwrap()
            .insert(pin.number, pin.level_for(active));
    }

    pub fn is_active(&self, pin: GpioPin) -> bool {
        let level = self.levels.lock().unwrap().get(&pin.number).copied();
        pin.is_active_level(level.unwrap_or(false))
    }
}

impl PinDriver for FakePins {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.set_active(pin, true);
        async { Ok(()) }
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.set_active(pin, false);
        async { Ok(()) }
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        let level = self
            .levels
            .lock()
            .unwrap()
            .get(&number)
            .copied()
            .unwrap_or(false);
        async move { Ok(level) }
    }
}

#[derive(Default)]
pub struct FakeDevices {
    pub heat_pumps: Mutex<Vec<HeatPump>>,
    pub boilers: Mutex<Vec<Boiler>>,
    pub air_handlers: Mutex<Vec<AirHandler>>,
    pub radiant_loops: Mutex<Vec<RadiantFloorLoop>>,
    pub changes: Mutex<HashMap<String, Timestamp>>,
    pub swaps: Mutex<usize>,
}

impl FakeDevices {
    pub fn changed(&self, name: &str) -> bool {
        self.changes.lock().unwrap().contains_key(name)
    }
}

impl DeviceRepository for FakeDevices {
    fn heat_pumps(&self) -> impl Future<Output = Result<Vec<HeatPump>, HvacError>> + Send {
        let all = self.heat_pumps.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn boilers(&self) -> impl Future<Output = Result<Vec<Boiler>, HvacError>> + Send {
        let all = self.boilers.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn air_handlers(&self) -> impl Future<Output = Result<Vec<AirHandler>, HvacError>> + Send {
        let all = self.air_handlers.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn radiant_loops(&self) -> impl Future<Output = Result<Vec<RadiantFloorLoop>, HvacError>> + Send {
        let all = self.radiant_loops.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn swap_primary_heat_pump(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        for pump in self.heat_pumps.lock().unwrap().iter_mut() {
            pump.is_primary = !pump.is_primary;
            pump.last_rotated = now;
        }
        *self.swaps.lock().unwrap() += 1;
        async { Ok(()) }
    }

    fn update_last_changed(
        &self,
        name: &str,
        at: Timestamp,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.changes.lock().unwrap().insert(name.to_string(), at);
        for pump in self.heat_pumps.lock().unwrap().iter_mut() {
            if pump.device.name == name {
                pump.device.last_changed = at;
            }
        }
        for handler in self.air_handlers.lock().unwrap().iter_mut() {
            if handler.device.name == name {
                handler.device.last_changed = at;
            }
        }
        async { Ok(()) }
    }

    fn set_online(
        &self,
        name: &str,
        online: bool,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        for pump in self.heat_pumps.lock().unwrap().iter_mut() {
            if pump.device.name == name {
                pump.device.online = online;
            }
        }
        async { Ok(()) }
    }
}

pub struct FakeSystem {
    pub state: Mutex<SystemState>,
}

impl FakeSystem {
    pub fn with_mode(mode: SystemMode) -> Self {
        let mut state = SystemState::initial(GpioPin::new(25, true));
        state.mode = mode;
        Self {
            state: Mutex::new(state),
        }
    }

    pub fn snapshot(&self) -> SystemState {
        self.state.lock().unwrap().clone()
    }
}

impl SystemRepository for FakeSystem {
    fn get(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let state = self.snapshot();
        async { Ok(state) }
    }

    fn set_mode(&self, mode: SystemMode) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.state.lock().unwrap().mode = mode;
        async { Ok(()) }
    }

    fn set_override(
        &self,
        mode: SystemMode,
    ) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.apply_override(mode);
        let state = state.clone();
        async { Ok(state) }
    }

    fn clear_override(&self) -> impl Future<Output = Result<SystemState, HvacError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.clear_override();
        let state = state.clone();
        async { Ok(state) }
    }

    fn set_recirculation(
        &self,
        active: bool,
        started_at: Option<Timestamp>,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.state
            .lock()
            .unwrap()
            .set_recirculation(active, started_at);
        async { Ok(()) }
    }
}

/// Zones kept in insertion order.
#[derive(Default)]
pub struct FakeZones {
    pub zones: Mutex<Vec<Zone>>,
}

impl FakeZones {
    pub fn with(zones: Vec<Zone>) -> Self {
        Self {
            zones: Mutex::new(zones),
        }
    }

    pub fn find(&self, id: &ZoneId) -> Option<Zone> {
        self.zones.lock().unwrap().iter().find(|z| &z.id == id).cloned()
    }
}

impl ZoneRepository for FakeZones {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Zone>, HvacError>> + Send {
        let all = self.zones.lock().unwrap().clone();
        async { Ok(all) }
    }

    fn get_by_id(&self, id: &ZoneId) -> impl Future<Output = Result<Option<Zone>, HvacError>> + Send {
        let found = self.find(id);
        async { Ok(found) }
    }

    fn update_mode(
        &self,
        id: &ZoneId,
        mode: SystemMode,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        for zone in self.zones.lock().unwrap().iter_mut() {
            if &zone.id == id {
                zone.mode = mode;
            }
        }
        async { Ok(()) }
    }

    fn update_setpoint(
        &self,
        id: &ZoneId,
        setpoint: f64,
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        for zone in self.zones.lock().unwrap().iter_mut() {
            if &zone.id == id {
                zone.setpoint = setpoint;
            }
        }
        async { Ok(()) }
    }
}

#[derive(Default)]
pub struct FakeSensors {
    pub sensors: Mutex<HashMap<SensorId, Sensor>>,
}

impl FakeSensors {
    pub fn add(&self, id: &str, bus: &str) {
        let id = sensor(id);
        self.sensors.lock().unwrap().insert(
            id.clone(),
            Sensor {
                id,
                bus: bus.to_string(),
            },
        );
    }
}

impl SensorRepository for FakeSensors {
    fn get_all(&self) -> impl Future<Output = Result<Vec<Sensor>, HvacError>> + Send {
        let all = self.sensors.lock().unwrap().values().cloned().collect();
        async { Ok(all) }
    }

    fn get_by_id(
        &self,
        id: &SensorId,
    ) -> impl Future<Output = Result<Option<Sensor>, HvacError>> + Send {
        let found = self.sensors.lock().unwrap().get(id).cloned();
        async { Ok(found) }
    }
}

/// Scripted raw readings per bus; a bus with no script fails.
#[derive(Default)]
pub struct FakeReader {
    pub scripts: Mutex<HashMap<String, Vec<f64>>>,
}

impl FakeReader {
    pub fn script(&self, bus: &str, values: &[f64]) {
        let mut values = values.to_vec();
        values.reverse();
        self.scripts.lock().unwrap().insert(bus.to_string(), values);
    }
}

impl SensorReader for FakeReader {
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send {
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(bus)
            .and_then(Vec::pop)
            .ok_or_else(|| HvacError::Hardware(format!("no reading on {bus}").into()));
        async move { next }
    }
}

/// Fixed temperatures per sensor.
#[derive(Default)]
pub struct FakeTemperatures {
    pub values: Mutex<HashMap<SensorId, f64>>,
}

impl FakeTemperatures {
    pub fn set(&self, id: &str, value: f64) {
        self.values.lock().unwrap().insert(sensor(id), value);
    }
}

impl TemperatureSource for FakeTemperatures {
    fn temperature(&self, sensor: &SensorId) -> Option<f64> {
        self.values.lock().unwrap().get(sensor).copied()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.sent
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
        async { Ok(()) }
    }
}

#[derive(Default)]
pub struct RecordingMetrics {
    pub gauges: Mutex<Vec<(String, f64, Vec<String>)>>,
}

impl MetricsSink for RecordingMetrics {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        self.gauges
            .lock()
            .unwrap()
            .push((name.to_string(), value, tags.to_vec()));
        async { Ok(()) }
    }
}

#[derive(Default)]
pub struct RecordingPower {
    pub stops: Mutex<Vec<String>>,
}

impl PowerControl for RecordingPower {
    fn emergency_stop(&self, reason: &HvacError) -> impl Future<Output = ()> + Send {
        self.stops.lock().unwrap().push(reason.to_string());
        async {}
    }
}
