//! Temperature service — reads every probe, filters each reading and
//! publishes the trusted value to the controllers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hvac_domain::anomaly::{AnomalyPolicy, Outcome, Reading, ReadingHistory, SensorEvent};
use hvac_domain::error::{FatalError, HvacError};
use hvac_domain::id::{BUFFER_TANK_SENSOR, SensorId};
use hvac_domain::sensor::Sensor;
use hvac_domain::time::{Timestamp, delta, now};

use crate::ports::{
    MetricsSink, NoMetrics, Notifier, SensorReader, SensorRepository, SensorStatus,
    SensorStatusSource, TemperatureSource, ZoneRepository,
};
use crate::worker::Controller;

#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSettings {
    pub policy: AnomalyPolicy,
    pub poll_interval: Duration,
    /// Extra attempts per probe after a failed read.
    pub retries: u32,
    pub retry_backoff: Duration,
    /// Pause between two probes on the shared 1-Wire bus.
    pub read_gap: Duration,
}

impl Default for TemperatureSettings {
    fn default() -> Self {
        Self {
            policy: AnomalyPolicy::default(),
            poll_interval: Duration::from_secs(30),
            retries: 3,
            retry_backoff: Duration::from_secs(2),
            read_gap: Duration::from_millis(500),
        }
    }
}

#[derive(Default)]
struct State {
    histories: HashMap<SensorId, ReadingHistory>,
    published: HashMap<SensorId, Reading>,
}

/// Owns the anomaly filter of every sensor.
///
/// Filter state lives behind one mutex; the lock is never held across IO.
pub struct TemperatureService<Z, S, R, N, M = NoMetrics> {
    zones: Z,
    sensors: S,
    reader: R,
    notifier: N,
    metrics: M,
    settings: TemperatureSettings,
    state: Mutex<State>,
}

impl<Z, S, R, N> TemperatureService<Z, S, R, N>
where
    Z: ZoneRepository,
    S: SensorRepository,
    R: SensorReader,
    N: Notifier,
{
    pub fn new(zones: Z, sensors: S, reader: R, notifier: N, settings: TemperatureSettings) -> Self {
        Self {
            zones,
            sensors,
            reader,
            notifier,
            metrics: NoMetrics,
            settings,
            state: Mutex::new(State::default()),
        }
    }

    /// Report every published reading as a gauge to `metrics`.
    #[must_use]
    pub fn with_metrics<M: MetricsSink>(self, metrics: M) -> TemperatureService<Z, S, R, N, M> {
        TemperatureService {
            zones: self.zones,
            sensors: self.sensors,
            reader: self.reader,
            notifier: self.notifier,
            metrics,
            settings: self.settings,
            state: self.state,
        }
    }
}

impl<Z, S, R, N, M> TemperatureService<Z, S, R, N, M>
where
    Z: ZoneRepository,
    S: SensorRepository,
    R: SensorReader,
    N: Notifier,
    M: MetricsSink,
{
    /// Read every zone probe plus the buffer tank once.
    ///
    /// Read failures are logged and skipped. Returns how many probes produced
    /// a reading.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::BufferSensorDisabled`] once the buffer tank probe
    /// is disabled (after the alert went out), or a storage error.
    pub async fn read_all_sensors(&self) -> Result<usize, HvacError> {
        let targets = self.targets().await?;
        let mut read = 0;
        let mut fatal = None;

        for (index, (sensor, zone)) in targets.iter().enumerate() {
            if index > 0 && !self.settings.read_gap.is_zero() {
                tokio::time::sleep(self.settings.read_gap).await;
            }

            let raw = match self
                .reader
                .read_with_retries(&sensor.bus, self.settings.retries, self.settings.retry_backoff)
                .await
            {
                Ok(temperature) => temperature,
                Err(err) => {
                    tracing::warn!(sensor_id = %sensor.id, %zone, error = %err, "sensor read failed");
                    continue;
                }
            };
            read += 1;

            let outcome = self.process(&sensor.id, zone, raw, now());
            if outcome.accepted {
                tracing::debug!(sensor_id = %sensor.id, %zone, temp = raw, "temperature reading accepted");
            } else {
                tracing::warn!(sensor_id = %sensor.id, %zone, temp = raw, "temperature reading rejected as anomalous");
            }
            if let Some(reading) = outcome.published {
                self.report(zone, reading.temperature).await;
            }

            if let Some(event) = &outcome.event {
                self.announce(event, zone).await;
                if let SensorEvent::Disabled {
                    shutdown: true,
                    anomalies,
                    ..
                } = event
                {
                    fatal = Some(FatalError::BufferSensorDisabled(*anomalies));
                }
            }
        }

        tracing::info!(sensors_read = read, "completed temperature reading cycle");
        match fatal {
            Some(err) => Err(err.into()),
            None => Ok(read),
        }
    }

    /// Feed one raw reading through the sensor's filter.
    pub fn process(&self, sensor: &SensorId, zone: &str, temperature: f64, at: Timestamp) -> Outcome {
        let mut guard = self.lock();
        let state = &mut *guard;
        let history = state
            .histories
            .entry(sensor.clone())
            .or_insert_with(|| self.settings.policy.history_for(zone));
        let outcome = history.process(&self.settings.policy, temperature, at);
        if let Some(reading) = outcome.published {
            state.published.insert(sensor.clone(), reading);
        }
        outcome
    }

    /// Trusted value of `sensor`, or `None` when missing or stale.
    #[must_use]
    pub fn temperature_at(&self, sensor: &SensorId, now: Timestamp) -> Option<f64> {
        let reading = self.lock().published.get(sensor).copied()?;
        if self.is_stale(&reading, now) {
            tracing::debug!(sensor_id = %sensor, "temperature reading is stale");
            return None;
        }
        Some(reading.temperature)
    }

    /// Every sensor seen so far, sorted by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SensorStatus> {
        let current = now();
        let state = self.lock();
        let mut statuses: Vec<SensorStatus> = state
            .histories
            .iter()
            .map(|(id, history)| {
                let published = state.published.get(id);
                SensorStatus {
                    sensor_id: id.clone(),
                    zone: history.zone().to_string(),
                    temperature: published.map(|r| r.temperature),
                    read_at: published.map(|r| r.at),
                    disabled: history.is_disabled(),
                    anomaly_count: history.anomaly_count(),
                    stale: published.is_none_or(|r| self.is_stale(r, current)),
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.sensor_id.as_str().cmp(b.sensor_id.as_str()));
        statuses
    }

    fn is_stale(&self, reading: &Reading, now: Timestamp) -> bool {
        now - reading.at > delta(self.settings.poll_interval * 2)
    }

    /// Distinct probes to read this cycle, each with the zone it belongs to.
    async fn targets(&self) -> Result<Vec<(Sensor, String)>, HvacError> {
        let sensors: HashMap<SensorId, Sensor> = self
            .sensors
            .get_all()
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        let mut targets: Vec<(Sensor, String)> = Vec::new();
        for zone in self.zones.get_all().await? {
            let Some(sensor) = sensors.get(&zone.sensor_id) else {
                tracing::error!(zone = %zone.id, sensor_id = %zone.sensor_id, "zone sensor not found");
                continue;
            };
            if targets.iter().all(|(s, _)| s.id != sensor.id) {
                targets.push((sensor.clone(), zone.id.to_string()));
            }
        }
        if let Some(buffer) = sensors.get(&SensorId::buffer_tank()) {
            targets.push((buffer.clone(), BUFFER_TANK_SENSOR.to_string()));
        }
        Ok(targets)
    }

    /// Gauge of the value consumers see, frozen baseline included.
    async fn report(&self, zone: &str, temperature: f64) {
        let (name, tags) = if zone == BUFFER_TANK_SENSOR {
            ("buffer_tank.temperature", vec!["component:sensor".to_string()])
        } else {
            (
                "zone.temperature",
                vec!["component:sensor".to_string(), format!("zone:{zone}")],
            )
        };
        if let Err(err) = self.metrics.gauge(name, temperature, &tags).await {
            tracing::debug!(%zone, metric = name, error = %err, "failed to emit gauge");
        }
    }

    async fn announce(&self, event: &SensorEvent, zone: &str) {
        match event {
            SensorEvent::Disabled {
                temperature,
                last_good,
                anomalies,
                ..
            } => {
                tracing::error!(%zone, temp = temperature, last_good, anomalies, "sensor disabled");
            }
            SensorEvent::Recovered { temperature, .. } => {
                tracing::info!(%zone, temp = temperature, "sensor recovered");
            }
            SensorEvent::BaselineShift { temperature } => {
                tracing::info!(%zone, temp = temperature, "legitimate temperature change, new baseline");
            }
        }

        if let Some(notification) = event.notification(zone)
            && let Err(err) = self
                .notifier
                .send(&notification.title, &notification.message)
                .await
        {
            tracing::warn!(%zone, error = %err, "failed to send notification");
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Z, S, R, N, M> TemperatureSource for TemperatureService<Z, S, R, N, M>
where
    Z: ZoneRepository,
    S: SensorRepository,
    R: SensorReader,
    N: Notifier,
    M: MetricsSink,
{
    fn temperature(&self, sensor: &SensorId) -> Option<f64> {
        self.temperature_at(sensor, now())
    }
}

impl<Z, S, R, N, M> SensorStatusSource for TemperatureService<Z, S, R, N, M>
where
    Z: ZoneRepository,
    S: SensorRepository,
    R: SensorReader,
    N: Notifier,
    M: MetricsSink,
{
    fn sensor_statuses(&self) -> Vec<SensorStatus> {
        self.snapshot()
    }
}

impl<Z, S, R, N, M> Controller for TemperatureService<Z, S, R, N, M>
where
    Z: ZoneRepository,
    S: SensorRepository,
    R: SensorReader,
    N: Notifier,
    M: MetricsSink,
{
    fn name(&self) -> &str {
        "temperature"
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move { self.read_all_sensors().await.map(|_| ()) }
    }
}
