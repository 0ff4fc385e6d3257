//! # hvac-adapter-gpio
//!
//! Hardware adapter for the relay board and the 1-Wire temperature bus.
//!
//! ## Provided drivers
//!
//! | Type | Port | Behaviour |
//! |------|------|-----------|
//! | [`PinctrlDriver`] | `PinDriver` | Shells out to `pinctrl set` / `pinctrl lev` |
//! | [`SafeModeDriver`] | `PinDriver` | Passes reads through, logs and drops writes |
//! | [`VirtualPinBoard`] | `PinDriver` | In-memory pin levels |
//! | [`W1SensorReader`] | `SensorReader` | Parses `<dir>/<bus>/w1_slave` |
//! | [`VirtualSensorReader`] | `SensorReader` | Fixed, settable temperatures |
//!
//! ## Dependency rule
//!
//! Depends on `hvac-app` (port traits) and `hvac-domain` only.

mod error;
mod pinctrl;
mod safe_mode;
mod virtual_board;
mod w1;

pub use error::GpioError;
pub use pinctrl::PinctrlDriver;
pub use safe_mode::SafeModeDriver;
pub use virtual_board::{VirtualPinBoard, VirtualSensorReader};
pub use w1::{W1SensorReader, parse_w1_slave};
