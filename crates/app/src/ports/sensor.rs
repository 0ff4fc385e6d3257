//! Sensor port — raw temperature probes.

use std::future::Future;
use std::time::Duration;

use hvac_domain::error::HvacError;

/// Reads one probe, addressed by its bus name.
pub trait SensorReader: Send + Sync {
    /// A single attempt, in degrees Fahrenheit.
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send;

    /// Read with up to `retries` further attempts, waiting `backoff` between them.
    ///
    /// Returns the last error once the retries are exhausted.
    fn read_with_retries(
        &self,
        bus: &str,
        retries: u32,
        backoff: Duration,
    ) -> impl Future<Output = Result<f64, HvacError>> + Send {
        async move {
            let mut remaining = retries;
            loop {
                match self.read_fahrenheit(bus).await {
                    Ok(temperature) => return Ok(temperature),
                    Err(err) if remaining > 0 => {
                        tracing::debug!(bus, remaining, error = %err, "sensor read failed, retrying");
                        remaining -= 1;
                        tokio::time::sleep(backoff).await;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
    }
}

impl<T: SensorReader> SensorReader for std::sync::Arc<T> {
    fn read_fahrenheit(&self, bus: &str) -> impl Future<Output = Result<f64, HvacError>> + Send {
        (**self).read_fahrenheit(bus)
    }
}
