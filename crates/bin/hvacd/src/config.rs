//! Configuration loading — TOML file with environment variable overrides.
//!
//! Reads `hvac.toml` from the working directory, or the file named by
//! `HVAC_CONFIG`. Every section has defaults, so the file is optional.
//! Environment variables take precedence over file values.
//!
//! The plant description (`sensors`, `zones`, `devices`) only seeds the store
//! on first boot; after that the store is the source of truth.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use serde::Deserialize;

use hvac_adapter_ntfy::DEFAULT_BASE_URL;
use hvac_adapter_statsd::DEFAULT_AGENT_ADDR;
use hvac_adapter_storage_sqlite_sqlx::seed::Seed;
use hvac_app::controllers::heat_source::HeatSourceSettings;
use hvac_app::services::temperature_service::TemperatureSettings;
use hvac_app::services::zone_service::ZoneLimits;
use hvac_app::worker::Schedule;
use hvac_domain::anomaly::AnomalyPolicy;
use hvac_domain::device::{AirHandler, Boiler, Device, HeatPump, RadiantFloorLoop};
use hvac_domain::error::HvacError;
use hvac_domain::failsafe::FailsafeSettings;
use hvac_domain::heat_source::ThresholdSettings;
use hvac_domain::id::{SensorId, ZoneId};
use hvac_domain::mode::SystemMode;
use hvac_domain::pin::GpioPin;
use hvac_domain::sensor::Sensor;
use hvac_domain::time::Timestamp;
use hvac_domain::zone::Zone;

const DEFAULT_PATH: &str = "hvac.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub hardware: HardwareConfig,
    pub thresholds: ThresholdConfig,
    pub failsafe: FailsafeSettings,
    pub zone_limits: ZoneLimitsConfig,
    pub anomaly: AnomalyPolicy,
    pub polling: PollingConfig,
    pub notifications: NotificationsConfig,
    pub metrics: MetricsConfig,
    pub sensors: Vec<SensorConfig>,
    pub zones: Vec<ZoneConfig>,
    pub devices: DevicesConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// TCP port.
    pub port: u16,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Where relay pins are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinBackend {
    /// The `pinctrl` tool and 1-Wire probes under `w1_devices_dir`.
    #[default]
    Pinctrl,
    /// In-memory pins and probes, for development.
    Virtual,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Read pins and probes but never write a relay.
    pub safe_mode: bool,
    pub pin_backend: PinBackend,
    pub w1_devices_dir: PathBuf,
    /// Extra attempts per probe read.
    pub sensor_retries: u32,
    /// Polarity shared by every relay on the board.
    pub relay_active_high: bool,
    pub main_power_pin: u8,
    /// What every probe reads on the virtual backend.
    pub virtual_temperature: f64,
}

/// Buffer tank thresholds, all in °F, and the primary rotation period.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    pub heating_threshold: f64,
    pub cooling_threshold: f64,
    pub spread: f64,
    pub secondary_margin: f64,
    pub tertiary_margin: f64,
    pub role_rotation_minutes: i64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ZoneLimitsConfig {
    pub min_setpoint: f64,
    pub max_setpoint: f64,
}

/// Cycle interval and the startup delay of each worker, in seconds.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub temperature_delay_secs: u64,
    pub heat_source_delay_secs: u64,
    pub zone_delay_secs: u64,
    pub failsafe_delay_secs: u64,
    pub recirculation_delay_secs: u64,
    /// Upper bound of the random extra startup delay.
    pub jitter_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NotificationsConfig {
    /// Alerts are only logged when no topic is set.
    pub ntfy_topic: Option<String>,
    pub ntfy_base_url: String,
}

/// DogStatsD temperature gauges.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub agent_addr: String,
    /// Prepended to every metric name.
    pub namespace: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    pub id: SensorId,
    /// 1-Wire device name, e.g. `28-0316a2790aff`.
    pub bus: String,
}

#[derive(Debug, Deserialize)]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub label: String,
    #[serde(default = "default_setpoint")]
    pub setpoint: f64,
    #[serde(default)]
    pub mode: SystemMode,
    #[serde(default)]
    pub capabilities: Vec<SystemMode>,
    /// Defaults to a sensor named after the zone.
    #[serde(default)]
    pub sensor: Option<SensorId>,
}

impl ZoneConfig {
    fn sensor_id(&self) -> Result<SensorId, HvacError> {
        match &self.sensor {
            Some(sensor) => Ok(sensor.clone()),
            None => Ok(SensorId::new(self.id.as_str())?),
        }
    }
}

fn default_setpoint() -> f64 {
    68.0
}

fn online() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    pub heat_pumps: DeviceGroup<HeatPumpUnit>,
    pub boilers: DeviceGroup<RelayUnit>,
    pub air_handlers: DeviceGroup<AirHandlerUnit>,
    pub radiant_loops: DeviceGroup<RadiantLoopUnit>,
}

/// Units of one kind sharing a timing profile.
#[derive(Debug, Deserialize)]
#[serde(default, bound(deserialize = "U: Deserialize<'de>"))]
pub struct DeviceGroup<U> {
    pub profile: Profile,
    pub units: Vec<U>,
}

impl<U> Default for DeviceGroup<U> {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            units: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub min_on_minutes: i64,
    pub min_off_minutes: i64,
    pub active_modes: Vec<SystemMode>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            min_on_minutes: 5,
            min_off_minutes: 5,
            active_modes: vec![SystemMode::Heating, SystemMode::Cooling],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HeatPumpUnit {
    pub name: String,
    pub pin: u8,
    pub mode_pin: u8,
    #[serde(default = "online")]
    pub online: bool,
}

#[derive(Debug, Deserialize)]
pub struct RelayUnit {
    pub name: String,
    pub pin: u8,
}

#[derive(Debug, Deserialize)]
pub struct AirHandlerUnit {
    pub name: String,
    /// Blower relay.
    pub pin: u8,
    pub circ_pump_pin: u8,
    pub zone: ZoneId,
}

#[derive(Debug, Deserialize)]
pub struct RadiantLoopUnit {
    pub name: String,
    pub pin: u8,
    pub zone: ZoneId,
}

/// When each worker starts and how often it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedules {
    pub temperature: Schedule,
    pub heat_source: Schedule,
    pub zone: Schedule,
    pub failsafe: Schedule,
    pub recirculation: Schedule,
}

impl PollingConfig {
    #[must_use]
    pub fn schedules(&self) -> Schedules {
        let every = Schedule::every(Duration::from_secs(self.interval_secs))
            .with_jitter(Duration::from_secs(self.jitter_secs));
        let after = |secs: u64| every.after(Duration::from_secs(secs));
        Schedules {
            temperature: after(self.temperature_delay_secs),
            heat_source: after(self.heat_source_delay_secs),
            zone: after(self.zone_delay_secs),
            failsafe: after(self.failsafe_delay_secs),
            recirculation: after(self.recirculation_delay_secs),
        }
    }
}

impl Config {
    /// Load configuration from `hvac.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// result fails validation.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("HVAC_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("HVAC_BIND")
            && let Some((host, port)) = val.rsplit_once(':')
        {
            self.server.host = host.to_string();
            if let Ok(port) = port.parse() {
                self.server.port = port;
            }
        }
        if let Some(val) = var("HVAC_DATABASE_URL") {
            self.database.url = val;
        }
        if let Some(val) = var("HVAC_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("HVAC_SAFE_MODE") {
            self.hardware.safe_mode = matches!(val.trim(), "1" | "true" | "yes" | "on");
        }
        if let Some(val) = var("HVAC_NTFY_TOPIC") {
            self.notifications.ntfy_topic = Some(val).filter(|topic| !topic.is_empty());
        }
        if let Some(val) = var("HVAC_STATSD_ADDR") {
            self.metrics.enabled = !val.is_empty();
            if self.metrics.enabled {
                self.metrics.agent_addr = val;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("port must be non-zero"));
        }
        if self.thresholds.spread <= 0.0 || self.failsafe.spread <= 0.0 {
            return Err(invalid("spread must be positive"));
        }
        if self.failsafe.min_temp >= self.failsafe.max_temp {
            return Err(invalid("failsafe min_temp must be below max_temp"));
        }
        if self.zone_limits.min_setpoint >= self.zone_limits.max_setpoint {
            return Err(invalid("zone_limits min_setpoint must be below max_setpoint"));
        }
        if self.polling.interval_secs == 0 {
            return Err(invalid("polling interval must be non-zero"));
        }
        self.anomaly
            .validate()
            .map_err(|err| invalid(format!("anomaly: {err}")))?;

        let devices = &self.devices;
        if !matches!(devices.heat_pumps.units.len(), 0 | 2) {
            return Err(invalid(format!(
                "expected 0 or 2 heat pumps, found {}",
                devices.heat_pumps.units.len()
            )));
        }
        if devices.boilers.units.len() > 1 {
            return Err(invalid("at most one boiler is supported"));
        }
        if devices.boilers.profile.active_modes.contains(&SystemMode::Cooling) {
            return Err(invalid("boilers cannot be active in cooling"));
        }

        let mut sensors = HashSet::new();
        for sensor in &self.sensors {
            if !sensors.insert(&sensor.id) {
                return Err(invalid(format!("sensor {} is declared twice", sensor.id)));
            }
        }
        let mut zones = HashSet::new();
        for zone in &self.zones {
            if !zones.insert(&zone.id) {
                return Err(invalid(format!("zone {} is declared twice", zone.id)));
            }
            let sensor = zone.sensor_id()?;
            if !sensors.contains(&sensor) {
                return Err(invalid(format!(
                    "zone {} references unknown sensor {sensor}",
                    zone.id
                )));
            }
        }
        let served = devices
            .air_handlers
            .units
            .iter()
            .map(|u| (&u.name, &u.zone))
            .chain(devices.radiant_loops.units.iter().map(|u| (&u.name, &u.zone)));
        for (name, zone) in served {
            if !zones.contains(zone) {
                return Err(invalid(format!("{name} references unknown zone {zone}")));
            }
        }

        self.check_pins()?;
        self.seed(hvac_domain::time::now())?;
        Ok(())
    }

    /// Every relay pin and device name must be used once.
    fn check_pins(&self) -> Result<(), ConfigError> {
        let devices = &self.devices;
        let mut used: Vec<(String, u8)> = vec![("main_power".to_string(), self.hardware.main_power_pin)];
        for unit in &devices.heat_pumps.units {
            used.push((unit.name.clone(), unit.pin));
            used.push((format!("{}.mode", unit.name), unit.mode_pin));
        }
        for unit in &devices.boilers.units {
            used.push((unit.name.clone(), unit.pin));
        }
        for unit in &devices.air_handlers.units {
            used.push((unit.name.clone(), unit.pin));
            used.push((format!("{}.circ_pump", unit.name), unit.circ_pump_pin));
        }
        for unit in &devices.radiant_loops.units {
            used.push((unit.name.clone(), unit.pin));
        }

        let mut pins: HashMap<u8, &str> = HashMap::new();
        let mut names = HashSet::new();
        for (name, pin) in &used {
            if !names.insert(name.as_str()) {
                return Err(invalid(format!("device name {name} is used twice")));
            }
            if let Some(other) = pins.insert(*pin, name.as_str()) {
                return Err(invalid(format!("{other} and {name} both use pin {pin}")));
            }
        }
        Ok(())
    }

    /// Return the `host:port` bind address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn heat_source_settings(&self) -> HeatSourceSettings {
        let t = &self.thresholds;
        HeatSourceSettings {
            thresholds: ThresholdSettings {
                heating_threshold: t.heating_threshold,
                cooling_threshold: t.cooling_threshold,
                spread: t.spread,
                secondary_margin: t.secondary_margin,
                tertiary_margin: t.tertiary_margin,
            },
            rotation_interval: TimeDelta::minutes(t.role_rotation_minutes),
        }
    }

    #[must_use]
    pub fn temperature_settings(&self) -> TemperatureSettings {
        TemperatureSettings {
            policy: self.anomaly.clone(),
            poll_interval: Duration::from_secs(self.polling.interval_secs),
            retries: self.hardware.sensor_retries,
            ..TemperatureSettings::default()
        }
    }

    #[must_use]
    pub fn zone_limits(&self) -> ZoneLimits {
        ZoneLimits {
            min_setpoint: self.zone_limits.min_setpoint,
            max_setpoint: self.zone_limits.max_setpoint,
        }
    }

    fn pin(&self, number: u8) -> GpioPin {
        GpioPin::new(number, self.hardware.relay_active_high)
    }

    /// The store contents for a first boot at `at`.
    ///
    /// The first heat pump starts as primary.
    ///
    /// # Errors
    ///
    /// Returns a validation error when a zone or device breaks a domain rule.
    pub fn seed(&self, at: Timestamp) -> Result<Seed, HvacError> {
        let mut seed = Seed::new(self.pin(self.hardware.main_power_pin));

        for sensor in &self.sensors {
            let sensor = Sensor {
                id: sensor.id.clone(),
                bus: sensor.bus.clone(),
            };
            sensor.validate()?;
            seed.sensors.push(sensor);
        }

        for zone in &self.zones {
            let builder = zone.capabilities.iter().fold(
                Zone::builder()
                    .id(zone.id.clone())
                    .label(zone.label.clone())
                    .setpoint(zone.setpoint)
                    .mode(zone.mode)
                    .sensor_id(zone.sensor_id()?),
                |builder, mode| builder.capability(*mode),
            );
            seed.zones.push(builder.build()?);
        }

        let devices = &self.devices;
        for (index, unit) in devices.heat_pumps.units.iter().enumerate() {
            let mut device = self.device(&unit.name, unit.pin, &devices.heat_pumps.profile, at)?;
            device.online = unit.online;
            seed.heat_pumps.push(HeatPump {
                device,
                mode_pin: self.pin(unit.mode_pin),
                is_primary: index == 0,
                last_rotated: at,
            });
        }
        for unit in &devices.boilers.units {
            seed.boilers.push(Boiler {
                device: self.device(&unit.name, unit.pin, &devices.boilers.profile, at)?,
            });
        }
        for unit in &devices.air_handlers.units {
            seed.air_handlers.push(AirHandler {
                device: self.device(&unit.name, unit.pin, &devices.air_handlers.profile, at)?,
                zone_id: unit.zone.clone(),
                circ_pump_pin: self.pin(unit.circ_pump_pin),
            });
        }
        for unit in &devices.radiant_loops.units {
            seed.radiant_loops.push(RadiantFloorLoop {
                device: self.device(&unit.name, unit.pin, &devices.radiant_loops.profile, at)?,
                zone_id: unit.zone.clone(),
            });
        }
        Ok(seed)
    }

    fn device(&self, name: &str, pin: u8, profile: &Profile, at: Timestamp) -> Result<Device, HvacError> {
        let device = Device {
            name: name.to_string(),
            pin: self.pin(pin),
            min_on: TimeDelta::minutes(profile.min_on_minutes),
            min_off: TimeDelta::minutes(profile.min_off_minutes),
            online: true,
            last_changed: at,
            active_modes: profile.active_modes.clone(),
        };
        device.validate()?;
        Ok(device)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:hvac.db".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "hvacd=info,hvac_app=info,hvac_adapter_gpio=info,tower_http=debug".to_string(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            safe_mode: false,
            pin_backend: PinBackend::default(),
            w1_devices_dir: PathBuf::from("/sys/bus/w1/devices"),
            sensor_retries: 3,
            relay_active_high: true,
            main_power_pin: 26,
            virtual_temperature: 68.0,
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        let t = ThresholdSettings::default();
        Self {
            heating_threshold: t.heating_threshold,
            cooling_threshold: t.cooling_threshold,
            spread: t.spread,
            secondary_margin: t.secondary_margin,
            tertiary_margin: t.tertiary_margin,
            role_rotation_minutes: 24 * 60,
        }
    }
}

impl Default for ZoneLimitsConfig {
    fn default() -> Self {
        let limits = ZoneLimits::default();
        Self {
            min_setpoint: limits.min_setpoint,
            max_setpoint: limits.max_setpoint,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            temperature_delay_secs: 30,
            heat_source_delay_secs: 180,
            zone_delay_secs: 180,
            failsafe_delay_secs: 120,
            recirculation_delay_secs: 300,
            jitter_secs: 5,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            ntfy_topic: None,
            ntfy_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            agent_addr: DEFAULT_AGENT_ADDR.to_string(),
            namespace: "hvac.".to_string(),
            tags: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
    /// A zone or device breaks a domain rule.
    #[error("invalid plant description")]
    Plant(#[from] HvacError),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

#[cfg(test)]
mod tests {
    use hvac_domain::time::now;

    use super::*;

    const PLANT: &str = "
        [hardware]
        main_power_pin = 26
        relay_active_high = false

        [[sensors]]
        id = 'main_floor'
        bus = '28-0001'

        [[sensors]]
        id = 'buffer_tank'
        bus = '28-0002'

        [[zones]]
        id = 'main_floor'
        label = 'Main Floor'
        setpoint = 70.0
        capabilities = ['heating', 'cooling', 'circulate']

        [devices.heat_pumps]
        units = [
            { name = 'hp_a', pin = 17, mode_pin = 27 },
            { name = 'hp_b', pin = 22, mode_pin = 23, online = false },
        ]

        [devices.boilers.profile]
        min_on_minutes = 10
        min_off_minutes = 10
        active_modes = ['heating']

        [[devices.boilers.units]]
        name = 'boiler'
        pin = 24

        [[devices.air_handlers.units]]
        name = 'main_floor_blower'
        pin = 5
        circ_pump_pin = 6
        zone = 'main_floor'
    ";

    fn plant() -> Config {
        toml::from_str(PLANT).unwrap()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.url, "sqlite:hvac.db");
        assert_eq!(config.hardware.pin_backend, PinBackend::Pinctrl);
        assert!(!config.hardware.safe_mode);
        assert!(config.notifications.ntfy_topic.is_none());
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.agent_addr, "127.0.0.1:8125");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.failsafe.min_temp, 50.0);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }

    #[test]
    fn should_reject_invalid_zone_id() {
        let result: Result<Config, _> = toml::from_str("[[zones]]\nid = 'main floor'\nlabel = 'x'");
        assert!(result.is_err());
    }

    #[test]
    fn should_parse_full_plant() {
        let config = plant();
        config.validate().unwrap();
        assert_eq!(config.devices.heat_pumps.units.len(), 2);
        assert!(!config.devices.heat_pumps.units[1].online);
        assert_eq!(config.devices.boilers.profile.min_on_minutes, 10);
        assert_eq!(config.devices.air_handlers.profile.min_on_minutes, 5);
        assert_eq!(config.zones[0].mode, SystemMode::Off);
    }

    #[test]
    fn should_build_seed_with_first_pump_primary() {
        let at = now();
        let seed = plant().seed(at).unwrap();

        assert_eq!(seed.main_power_pin, GpioPin::new(26, false));
        assert_eq!(seed.sensors.len(), 2);
        assert_eq!(seed.zones[0].sensor_id.as_str(), "main_floor");
        assert!(seed.heat_pumps[0].is_primary);
        assert!(!seed.heat_pumps[1].is_primary);
        assert!(!seed.heat_pumps[1].device.online);
        assert_eq!(seed.heat_pumps[0].mode_pin, GpioPin::new(27, false));
        assert_eq!(seed.boilers[0].device.min_off, TimeDelta::minutes(10));
        assert_eq!(seed.air_handlers[0].circ_pump_pin.number, 6);
        assert_eq!(seed.air_handlers[0].device.last_changed, at);
    }

    #[test]
    fn should_accept_sample_configuration() {
        let config: Config = toml::from_str(include_str!("../../../../hvac.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.zones.len(), 3);
        assert_eq!(config.devices.radiant_loops.units.len(), 2);
        assert!(config.failsafe.is_exempt(&ZoneId::new("garage").unwrap()));
        assert_eq!(config.metrics.tags, vec!["env:home"]);
    }

    #[test]
    fn should_reject_zero_port() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_non_positive_spread() {
        let mut config = Config::default();
        config.thresholds.spread = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_inverted_failsafe_bounds() {
        let mut config = Config::default();
        config.failsafe.min_temp = 90.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_undersized_anomaly_history() {
        let mut config = Config::default();
        config.anomaly.history_size = 4;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("history_size 4")));

        let mut config = Config::default();
        config.anomaly.max_anomalies = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn should_reject_conflicting_pins() {
        let mut config = plant();
        config.devices.boilers.units[0].pin = 17;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref msg) if msg.contains("pin 17")));
    }

    #[test]
    fn should_reject_pin_shared_with_main_power() {
        let mut config = plant();
        config.hardware.main_power_pin = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zone_with_unknown_sensor() {
        let mut config = plant();
        config.zones[0].sensor = Some(SensorId::new("attic").unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_distributor_for_unknown_zone() {
        let mut config = plant();
        config.devices.air_handlers.units[0].zone = ZoneId::new("attic").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_single_heat_pump() {
        let mut config = plant();
        config.devices.heat_pumps.units.pop();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_second_boiler() {
        let mut config = plant();
        config.devices.boilers.units.push(RelayUnit {
            name: "boiler_2".to_string(),
            pin: 25,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_cooling_boiler() {
        let mut config = plant();
        config.devices.boilers.profile.active_modes.push(SystemMode::Cooling);
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zone_in_unsupported_mode() {
        let mut config = plant();
        config.zones[0].capabilities = vec![SystemMode::Heating];
        config.zones[0].mode = SystemMode::Cooling;
        assert!(matches!(config.validate(), Err(ConfigError::Plant(_))));
    }

    #[test]
    fn should_apply_environment_overrides() {
        let mut config = Config::default();
        let vars: HashMap<&str, &str> = [
            ("HVAC_BIND", "127.0.0.1:9090"),
            ("HVAC_DATABASE_URL", "sqlite::memory:"),
            ("HVAC_LOG", "debug"),
            ("HVAC_SAFE_MODE", "true"),
            ("HVAC_NTFY_TOPIC", "house-hvac"),
            ("HVAC_STATSD_ADDR", "10.0.0.2:8125"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| vars.get(key).map(ToString::to_string));

        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.logging.filter, "debug");
        assert!(config.hardware.safe_mode);
        assert_eq!(config.notifications.ntfy_topic.as_deref(), Some("house-hvac"));
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.agent_addr, "10.0.0.2:8125");
    }

    #[test]
    fn should_let_rust_log_win_over_hvac_log() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "HVAC_LOG" => Some("info".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_derive_worker_schedules() {
        let schedules = PollingConfig::default().schedules();
        assert_eq!(schedules.zone.interval, Duration::from_secs(30));
        assert_eq!(schedules.failsafe.startup_delay, Duration::from_secs(120));
        assert_eq!(schedules.recirculation.startup_delay, Duration::from_secs(300));
        assert_eq!(schedules.temperature.jitter, Duration::from_secs(5));
    }

    #[test]
    fn should_derive_controller_settings() {
        let mut config = Config::default();
        config.thresholds.role_rotation_minutes = 60;
        config.hardware.sensor_retries = 1;

        assert_eq!(config.heat_source_settings().rotation_interval, TimeDelta::hours(1));
        assert_eq!(config.temperature_settings().retries, 1);
        assert_eq!(config.zone_limits().max_setpoint, 85.0);
    }
}
