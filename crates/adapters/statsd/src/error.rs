//! Metrics adapter error types.

use hvac_domain::error::HvacError;

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The socket could not be bound, connected or written.
    #[error("statsd socket error")]
    Io(#[from] std::io::Error),
}

/// Reported as a hardware error, never a fatal one.
impl From<MetricsError> for HvacError {
    fn from(err: MetricsError) -> Self {
        Self::Hardware(Box::new(err))
    }
}
