//! Temperature anomaly filter.
//!
//! Each sensor owns a [`ReadingHistory`]. Raw readings go through
//! [`ReadingHistory::process`], which decides whether the value can be
//! trusted and what value consumers should see instead when it cannot.
//!
//! The life of a history:
//!
//! 1. **Bootstrap** – the first `max_anomalies` readings are accepted as-is.
//!    On the last one the buffer is checked for outliers (more than two
//!    standard deviations from the mean); each counts as an anomaly and the
//!    newest non-outlier becomes the baseline.
//! 2. **Steady state** – a reading further than the zone's delta from the
//!    baseline is an anomaly, unless the recent buffer shows a believable
//!    environmental change (a stable new level or a small-step monotonic
//!    drift), in which case it becomes the new baseline.
//! 3. **Disabled** – after `max_anomalies` unexplained anomalies in a row
//!    the sensor is disabled and every reading is rejected.
//! 4. **Recovery** – `max_anomalies` consecutive readings close to the
//!    frozen baseline re-enable the sensor.
//!
//! Histories live for the process lifetime only.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::BUFFER_TANK_SENSOR;
use crate::time::Timestamp;

/// Window used by the stable-level check.
const STABLE_WINDOW: usize = 3;
/// Standard deviation under which the recent window counts as stable, °F.
const STABLE_STD_DEV: f64 = 2.0;
/// Anomaly streak from which drift is no longer considered.
const DRIFT_STREAK_CAP: usize = 4;
/// Step against the drift direction still tolerated as monotonic, °F.
const MONOTONIC_TOLERANCE: f64 = 0.5;
/// Bootstrap outlier cutoff, in standard deviations.
const BOOTSTRAP_SIGMA: f64 = 2.0;

/// Tunable limits of the filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyPolicy {
    /// Largest believable step from the baseline, °F.
    pub max_delta: f64,
    /// Same, for zones listed in `wide_delta_zones`.
    pub wide_delta: f64,
    /// Largest believable drift from the baseline, °F.
    pub max_drift: f64,
    /// Same, for zones listed in `wide_delta_zones`.
    pub wide_drift: f64,
    /// Bootstrap length, disable streak and recovery streak.
    pub max_anomalies: usize,
    pub history_size: usize,
    /// Zones whose temperature legitimately swings more (unheated garage).
    pub wide_delta_zones: Vec<String>,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            max_delta: 5.0,
            wide_delta: 25.0,
            max_drift: 15.0,
            wide_drift: 30.0,
            max_anomalies: 6,
            history_size: 20,
            wide_delta_zones: vec!["garage".to_string()],
        }
    }
}

impl AnomalyPolicy {
    /// The buffer must outgrow the bootstrap window, or the filter never
    /// leaves it and accepts every reading.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when `max_anomalies` is zero or
    /// `history_size` is below `max_anomalies + 2`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_anomalies == 0 {
            return Err(ValidationError::NoAnomalyLimit);
        }
        if self.history_size < self.max_anomalies + 2 {
            return Err(ValidationError::AnomalyHistoryTooShort {
                history_size: self.history_size,
                max_anomalies: self.max_anomalies,
            });
        }
        Ok(())
    }

    /// Start a history for a sensor owned by `zone`.
    #[must_use]
    pub fn history_for(&self, zone: impl Into<String>) -> ReadingHistory {
        let zone = zone.into();
        let wide = self.wide_delta_zones.iter().any(|z| *z == zone);
        ReadingHistory::new(zone, wide, self.history_size)
    }
}

/// A timestamped temperature, °F.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature: f64,
    pub at: Timestamp,
}

/// Something worth telling a human about.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorEvent {
    Disabled {
        temperature: f64,
        last_good: f64,
        anomalies: usize,
        /// The buffer tank went blind and the plant must shut down.
        shutdown: bool,
    },
    Recovered {
        temperature: f64,
        good_readings: usize,
    },
    BaselineShift {
        temperature: f64,
    },
}

/// Title and body of an alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl SensorEvent {
    /// Alert text for events that warrant one.
    #[must_use]
    pub fn notification(&self, zone: &str) -> Option<Notification> {
        let name = zone_display_name(zone);
        match self {
            Self::Disabled {
                temperature,
                last_good,
                anomalies,
                shutdown,
            } => {
                let prefix = if *shutdown {
                    "[System Shutdown]".to_string()
                } else {
                    format!("[{name} Zone Disabled]")
                };
                Some(Notification {
                    title: "HVAC Sensor Failure".to_string(),
                    message: format!(
                        "{prefix} {name}: {temperature:.1}°F ({anomalies} anomalies, last good: {last_good:.1}°F)"
                    ),
                })
            }
            Self::Recovered {
                temperature,
                good_readings,
            } => Some(Notification {
                title: "HVAC Sensor Recovery".to_string(),
                message: format!(
                    "[{name} Zone Recovered] {name}: {temperature:.1}°F ({good_readings} consecutive good readings)"
                ),
            }),
            Self::BaselineShift { .. } => None,
        }
    }
}

/// Human-readable name for a zone id.
#[must_use]
pub fn zone_display_name(zone: &str) -> String {
    match zone {
        "main_floor" => "Main Floor".to_string(),
        "basement" => "Basement".to_string(),
        "garage" => "Garage".to_string(),
        BUFFER_TANK_SENSOR => "Buffer Tank".to_string(),
        other => other.to_string(),
    }
}

/// Result of feeding one reading through the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub accepted: bool,
    /// What consumers should see: the reading itself when accepted, the
    /// frozen baseline (stamped with this cycle's time) otherwise.
    pub published: Option<Reading>,
    pub event: Option<SensorEvent>,
}

/// Per-sensor filter state.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingHistory {
    readings: VecDeque<Reading>,
    capacity: usize,
    last_good: Option<Reading>,
    anomaly_count: usize,
    recovery_count: usize,
    disabled: bool,
    disabled_at: Option<Timestamp>,
    zone: String,
    wide: bool,
}

impl ReadingHistory {
    #[must_use]
    pub fn new(zone: impl Into<String>, wide: bool, capacity: usize) -> Self {
        Self {
            readings: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            last_good: None,
            anomaly_count: 0,
            recovery_count: 0,
            disabled: false,
            disabled_at: None,
            zone: zone.into(),
            wide,
        }
    }

    #[must_use]
    pub fn zone(&self) -> &str {
        &self.zone
    }

    #[must_use]
    pub fn last_good(&self) -> Option<Reading> {
        self.last_good
    }

    #[must_use]
    pub fn anomaly_count(&self) -> usize {
        self.anomaly_count
    }

    #[must_use]
    pub fn recovery_count(&self) -> usize {
        self.recovery_count
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn disabled_at(&self) -> Option<Timestamp> {
        self.disabled_at
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    fn is_buffer_tank(&self) -> bool {
        self.zone == BUFFER_TANK_SENSOR
    }

    fn delta_limit(&self, policy: &AnomalyPolicy) -> f64 {
        if self.wide {
            policy.wide_delta
        } else {
            policy.max_delta
        }
    }

    fn drift_limit(&self, policy: &AnomalyPolicy) -> f64 {
        if self.wide {
            policy.wide_drift
        } else {
            policy.max_drift
        }
    }

    /// Run one raw reading through the filter.
    pub fn process(&mut self, policy: &AnomalyPolicy, temperature: f64, at: Timestamp) -> Outcome {
        let reading = Reading { temperature, at };

        // A dead probe reports zero or below; never buffer it.
        if temperature <= 0.0 {
            self.anomaly_count += 1;
            let event = self.check_disable(policy, temperature, at);
            return self.reject(at, event);
        }

        if self.readings.len() < policy.max_anomalies {
            self.push(reading);
            self.last_good = Some(reading);
            if self.readings.len() == policy.max_anomalies {
                self.analyze_bootstrap(at);
            }
            return Self::accept(reading, None);
        }

        if self.disabled {
            if !self.is_anomalous(policy, temperature) {
                self.recovery_count += 1;
                self.push(reading);
                if self.recovery_count >= policy.max_anomalies {
                    let good_readings = self.recovery_count;
                    self.disabled = false;
                    self.disabled_at = None;
                    self.anomaly_count = 0;
                    self.recovery_count = 0;
                    self.last_good = Some(reading);
                    return Self::accept(
                        reading,
                        Some(SensorEvent::Recovered {
                            temperature,
                            good_readings,
                        }),
                    );
                }
            } else {
                self.recovery_count = 0;
            }
            return self.reject(at, None);
        }

        if self.is_anomalous(policy, temperature) {
            self.push(reading);
            if self.detect_stable_new_baseline(policy) {
                self.anomaly_count = 0;
                self.last_good = Some(reading);
                return Self::accept(reading, Some(SensorEvent::BaselineShift { temperature }));
            }
            self.anomaly_count += 1;
            let event = self.check_disable(policy, temperature, at);
            return self.reject(at, event);
        }

        if self.readings.len() > policy.max_anomalies {
            self.anomaly_count = 0;
        }
        self.recovery_count = 0;
        self.last_good = Some(reading);
        self.push(reading);
        Self::accept(reading, None)
    }

    fn accept(reading: Reading, event: Option<SensorEvent>) -> Outcome {
        Outcome {
            accepted: true,
            published: Some(reading),
            event,
        }
    }

    fn reject(&self, at: Timestamp, event: Option<SensorEvent>) -> Outcome {
        Outcome {
            accepted: false,
            published: self.last_good.map(|good| Reading {
                temperature: good.temperature,
                at,
            }),
            event,
        }
    }

    fn push(&mut self, reading: Reading) {
        if self.readings.len() >= self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    fn is_anomalous(&self, policy: &AnomalyPolicy, temperature: f64) -> bool {
        self.last_good
            .is_some_and(|good| (temperature - good.temperature).abs() > self.delta_limit(policy))
    }

    fn check_disable(
        &mut self,
        policy: &AnomalyPolicy,
        temperature: f64,
        at: Timestamp,
    ) -> Option<SensorEvent> {
        if self.disabled || self.anomaly_count < policy.max_anomalies {
            return None;
        }
        self.disabled = true;
        self.disabled_at = Some(at);
        Some(SensorEvent::Disabled {
            temperature,
            last_good: self.last_good.map_or(0.0, |good| good.temperature),
            anomalies: self.anomaly_count,
            shutdown: self.is_buffer_tank(),
        })
    }

    fn analyze_bootstrap(&mut self, at: Timestamp) {
        let temps: Vec<f64> = self.readings.iter().map(|r| r.temperature).collect();
        let (mean, std_dev) = mean_and_std_dev(&temps);
        let cutoff = BOOTSTRAP_SIGMA * std_dev;

        let outliers = temps.iter().filter(|t| (*t - mean).abs() > cutoff).count();
        let baseline = temps
            .iter()
            .rev()
            .find(|t| (*t - mean).abs() <= cutoff)
            .copied()
            .unwrap_or(mean);

        self.anomaly_count = outliers;
        self.last_good = Some(Reading {
            temperature: baseline,
            at,
        });
    }

    /// Whether the newest buffered readings look like a real change.
    fn detect_stable_new_baseline(&self, policy: &AnomalyPolicy) -> bool {
        if self.anomaly_count < 1 || self.readings.len() < policy.max_anomalies + 2 {
            return false;
        }

        let recent: Vec<f64> = self
            .readings
            .iter()
            .skip(self.readings.len() - STABLE_WINDOW)
            .map(|r| r.temperature)
            .collect();
        let (mean, std_dev) = mean_and_std_dev(&recent);
        if std_dev < STABLE_STD_DEV {
            return true;
        }

        if self.anomaly_count >= DRIFT_STREAK_CAP {
            return false;
        }

        let drift: Vec<f64> = self
            .readings
            .iter()
            .skip(policy.max_anomalies)
            .map(|r| r.temperature)
            .collect();
        if drift.len() < 2 {
            return false;
        }

        let baseline = self.last_good.map_or(mean, |good| good.temperature);
        if (mean - baseline).abs() > self.drift_limit(policy) {
            return false;
        }

        let increasing = drift[1] > drift[0];
        let mut max_step = 0.0_f64;
        for pair in drift.windows(2) {
            let step = pair[1] - pair[0];
            if (increasing && step < -MONOTONIC_TOLERANCE)
                || (!increasing && step > MONOTONIC_TOLERANCE)
            {
                return false;
            }
            max_step = max_step.max(step.abs());
        }

        max_step > 0.0 && max_step <= self.delta_limit(policy)
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
