//! Temperature port — filtered readings for the controllers.

use hvac_domain::id::SensorId;
use hvac_domain::time::Timestamp;

/// The only way controllers see temperatures.
///
/// Returns `None` when the sensor has no trusted, fresh value; callers stand
/// down for the cycle.
pub trait TemperatureSource: Send + Sync {
    fn temperature(&self, sensor: &SensorId) -> Option<f64>;
}

impl<T: TemperatureSource> TemperatureSource for std::sync::Arc<T> {
    fn temperature(&self, sensor: &SensorId) -> Option<f64> {
        (**self).temperature(sensor)
    }
}

/// What the status surface shows for one probe.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorStatus {
    pub sensor_id: SensorId,
    pub zone: String,
    pub temperature: Option<f64>,
    pub read_at: Option<Timestamp>,
    pub disabled: bool,
    pub anomaly_count: usize,
    pub stale: bool,
}

/// Per-probe filter state, for display.
pub trait SensorStatusSource: Send + Sync {
    fn sensor_statuses(&self) -> Vec<SensorStatus>;
}

impl<T: SensorStatusSource> SensorStatusSource for std::sync::Arc<T> {
    fn sensor_statuses(&self) -> Vec<SensorStatus> {
        (**self).sensor_statuses()
    }
}
