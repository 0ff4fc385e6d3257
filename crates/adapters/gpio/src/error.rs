//! GPIO adapter error types.

use hvac_domain::error::HvacError;

/// Errors specific to the hardware adapter.
#[derive(Debug, thiserror::Error)]
pub enum GpioError {
    /// `pinctrl` could not be spawned.
    #[error("failed to run pinctrl")]
    Spawn(#[source] std::io::Error),

    /// `pinctrl` exited with a failure status.
    #[error("pinctrl {args} failed: {output}")]
    Command { args: String, output: String },

    /// `pinctrl lev` printed something other than `0` or `1`.
    #[error("unexpected output from pinctrl lev: {0:?}")]
    UnexpectedLevel(String),

    /// The probe's `w1_slave` file could not be read.
    #[error("failed to read sensor {bus}")]
    SensorIo {
        bus: String,
        #[source]
        source: std::io::Error,
    },

    /// The probe reported a CRC mismatch.
    #[error("sensor {0} failed its CRC check")]
    Crc(String),

    /// The `w1_slave` contents had no usable temperature.
    #[error("malformed reading from sensor {bus}: {content:?}")]
    Malformed { bus: String, content: String },

    /// No virtual temperature was set for the bus.
    #[error("no virtual reading for sensor {0}")]
    NoReading(String),
}

impl From<GpioError> for HvacError {
    fn from(err: GpioError) -> Self {
        Self::Hardware(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_convert_to_hardware_error() {
        let err: HvacError = GpioError::Crc("28-01".to_string()).into();
        assert!(matches!(err, HvacError::Hardware(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn should_display_unexpected_level() {
        let err = GpioError::UnexpectedLevel("x".to_string());
        assert_eq!(err.to_string(), "unexpected output from pinctrl lev: \"x\"");
    }
}
