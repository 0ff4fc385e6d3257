//! DS18B20 probes on the kernel's 1-Wire bus.

use std::future::Future;
use std::path::PathBuf;

use hvac_app::ports::SensorReader;
use hvac_domain::error::HvacError;

use crate::error::GpioError;

/// Reads `<devices_dir>/<bus>/w1_slave`.
#[derive(Debug, Clone)]
pub struct W1SensorReader {
    devices_dir: PathBuf,
}

impl Default for W1SensorReader {
    fn default() -> Self {
        Self::new("/sys/bus/w1/devices")
    }
}

impl W1SensorReader {
    pub fn new(devices_dir: impl Into<PathBuf>) -> Self {
        Self {
            devices_dir: devices_dir.into(),
        }
    }
}

/// Parse the two-line `w1_slave` format into degrees Fahrenheit.
///
/// ```text
/// 4b 01 4b 46 7f ff 05 10 e1 : crc=e1 YES
/// 4b 01 4b 46 7f ff 05 10 e1 t=20687
/// ```
///
/// # Errors
///
/// Returns [`GpioError::Crc`] when the first line does not end in `YES`, and
/// [`GpioError::Malformed`] when no `t=` value can be parsed.
pub fn parse_w1_slave(bus: &str, content: &str) -> Result<f64, GpioError> {
    let malformed = || GpioError::Malformed {
        bus: bus.to_string(),
        content: content.to_string(),
    };
    let mut lines = content.lines();
    let crc = lines.next().ok_or_else(malformed)?;
    if !crc.trim_end().ends_with("YES") {
        return Err(GpioError::Crc(bus.to_string()));
    }
    let milli_celsius: i32 = lines
        .next()
        .and_then(|line| line.split_once("t="))
        .and_then(|(_, value)| value.trim().parse().ok())
        .ok_or_else(malformed)?;
    let celsius = f64::from(milli_celsius) / 1000.0;
    Ok(celsius * 9.0 / 5.0 + 32.0)
}

impl SensorReader for W1SensorReader {
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send {
        let path = self.devices_dir.join(bus).join("w1_slave");
        let bus = bus.to_string();
        async move {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| GpioError::SensorIo {
                    bus: bus.clone(),
                    source,
                })?;
            let fahrenheit = parse_w1_slave(&bus, &content)?;
            tracing::trace!(%bus, temp = fahrenheit, "probe read");
            Ok(fahrenheit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = "4b 01 4b 46 7f ff 05 10 e1 : crc=e1 YES\n4b 01 4b 46 7f ff 05 10 e1 t=20000\n";

    #[test]
    fn should_convert_milli_celsius_to_fahrenheit() {
        let temp = parse_w1_slave("28-01", GOOD).unwrap();
        assert!((temp - 68.0).abs() < 1e-9);
    }

    #[test]
    fn should_reject_failed_crc() {
        let content = "4b 01 4b 46 7f ff 05 10 e1 : crc=e1 NO\n4b 01 4b 46 7f ff 05 10 e1 t=85000\n";
        assert!(matches!(
            parse_w1_slave("28-01", content),
            Err(GpioError::Crc(_))
        ));
    }

    #[test]
    fn should_reject_missing_temperature() {
        let content = "4b 01 4b 46 7f ff 05 10 e1 : crc=e1 YES\n";
        assert!(matches!(
            parse_w1_slave("28-01", content),
            Err(GpioError::Malformed { .. })
        ));
    }

    #[test]
    fn should_parse_negative_temperature() {
        let content = "ff ff : crc=aa YES\nff ff t=-10000\n";
        let temp = parse_w1_slave("28-01", content).unwrap();
        assert!((temp - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_read_probe_from_devices_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("28-0316a2790aff")).unwrap();
        std::fs::write(dir.path().join("28-0316a2790aff").join("w1_slave"), GOOD).unwrap();
        let reader = W1SensorReader::new(dir.path());

        let temp = reader.read_fahrenheit("28-0316a2790aff").await.unwrap();

        assert!((temp - 68.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn should_fail_for_missing_probe() {
        let dir = tempfile::tempdir().unwrap();
        let reader = W1SensorReader::new(dir.path());

        let result = reader.read_fahrenheit("28-missing").await;

        assert!(matches!(result, Err(HvacError::Hardware(_))));
    }
}
