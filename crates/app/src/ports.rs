//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the controller layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod metrics;
pub mod notifier;
pub mod pins;
pub mod power;
pub mod sensor;
pub mod storage;
pub mod temperature;

pub use metrics::{MetricsSink, NoMetrics};
pub use notifier::Notifier;
pub use pins::PinDriver;
pub use power::PowerControl;
pub use sensor::SensorReader;
pub use storage::{DeviceRepository, SensorRepository, SystemRepository, ZoneRepository};
pub use temperature::{SensorStatus, SensorStatusSource, TemperatureSource};
