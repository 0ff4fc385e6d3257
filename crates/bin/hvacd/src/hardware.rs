//! Backend selection for pins, probes, alerts and metrics.
//!
//! The ports use `impl Future` returns and are not object safe, so each
//! choice is a small enum forwarding to the adapter it wraps.

use std::future::Future;

use hvac_adapter_gpio::{
    PinctrlDriver, SafeModeDriver, VirtualPinBoard, VirtualSensorReader, W1SensorReader,
};
use hvac_adapter_ntfy::{LogNotifier, NotifyError, NtfyNotifier};
use hvac_adapter_statsd::{MetricsError, StatsdSink};
use hvac_app::ports::{MetricsSink, NoMetrics, Notifier, PinDriver, SensorReader};
use hvac_domain::error::HvacError;
use hvac_domain::pin::GpioPin;

use crate::config::{HardwareConfig, MetricsConfig, NotificationsConfig, PinBackend};

pub enum Pins {
    Pinctrl(PinctrlDriver),
    SafePinctrl(SafeModeDriver<PinctrlDriver>),
    Virtual(VirtualPinBoard),
}

impl Pins {
    #[must_use]
    pub fn from_config(config: &HardwareConfig) -> Self {
        match (config.pin_backend, config.safe_mode) {
            (PinBackend::Pinctrl, false) => Self::Pinctrl(PinctrlDriver::default()),
            (PinBackend::Pinctrl, true) => {
                tracing::warn!("safe mode enabled, relay writes are disabled");
                Self::SafePinctrl(SafeModeDriver::new(PinctrlDriver::default()))
            }
            (PinBackend::Virtual, _) => {
                tracing::warn!("using the virtual pin board, no relay will move");
                Self::Virtual(VirtualPinBoard::default())
            }
        }
    }

    /// The in-memory board, when pins are virtual.
    #[must_use]
    pub fn as_virtual(&self) -> Option<&VirtualPinBoard> {
        match self {
            Self::Virtual(board) => Some(board),
            _ => None,
        }
    }
}

impl PinDriver for Pins {
    fn activate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move {
            match self {
                Self::Pinctrl(driver) => driver.activate(pin).await,
                Self::SafePinctrl(driver) => driver.activate(pin).await,
                Self::Virtual(board) => board.activate(pin).await,
            }
        }
    }

    fn deactivate(&self, pin: GpioPin) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move {
            match self {
                Self::Pinctrl(driver) => driver.deactivate(pin).await,
                Self::SafePinctrl(driver) => driver.deactivate(pin).await,
                Self::Virtual(board) => board.deactivate(pin).await,
            }
        }
    }

    fn read_level(&self, number: u8) -> impl Future<Output = Result<bool, HvacError>> + Send {
        async move {
            match self {
                Self::Pinctrl(driver) => driver.read_level(number).await,
                Self::SafePinctrl(driver) => driver.read_level(number).await,
                Self::Virtual(board) => board.read_level(number).await,
            }
        }
    }
}

pub enum Probes {
    W1(W1SensorReader),
    Virtual(VirtualSensorReader),
}

impl Probes {
    #[must_use]
    pub fn from_config(config: &HardwareConfig) -> Self {
        match config.pin_backend {
            PinBackend::Pinctrl => Self::W1(W1SensorReader::new(&config.w1_devices_dir)),
            PinBackend::Virtual => {
                Self::Virtual(VirtualSensorReader::with_default(config.virtual_temperature))
            }
        }
    }
}

impl SensorReader for Probes {
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send {
        async move {
            match self {
                Self::W1(reader) => reader.read_fahrenheit(bus).await,
                Self::Virtual(reader) => reader.read_fahrenheit(bus).await,
            }
        }
    }
}

pub enum Alerts {
    Ntfy(NtfyNotifier),
    Log(LogNotifier),
}

impl Alerts {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &NotificationsConfig) -> Result<Self, NotifyError> {
        match &config.ntfy_topic {
            Some(topic) => Ok(Self::Ntfy(NtfyNotifier::new(&config.ntfy_base_url, topic)?)),
            None => {
                tracing::info!("no ntfy topic configured, alerts are only logged");
                Ok(Self::Log(LogNotifier))
            }
        }
    }
}

impl Notifier for Alerts {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move {
            match self {
                Self::Ntfy(notifier) => notifier.send(title, message).await,
                Self::Log(notifier) => notifier.send(title, message).await,
            }
        }
    }
}

pub enum Metrics {
    Statsd(StatsdSink),
    Off(NoMetrics),
}

impl Metrics {
    /// # Errors
    ///
    /// Returns an error if the agent address cannot be resolved.
    pub async fn from_config(config: &MetricsConfig) -> Result<Self, MetricsError> {
        if !config.enabled {
            return Ok(Self::Off(NoMetrics));
        }
        let sink =
            StatsdSink::connect(&config.agent_addr, &config.namespace, config.tags.clone()).await?;
        Ok(Self::Statsd(sink))
    }
}

impl MetricsSink for Metrics {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        async move {
            match self {
                Self::Statsd(sink) => sink.gauge(name, value, tags).await,
                Self::Off(sink) => sink.gauge(name, value, tags).await,
            }
        }
    }
}
