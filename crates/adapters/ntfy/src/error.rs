//! Notification adapter error types.

use hvac_domain::error::HvacError;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The request could not be built or sent.
    #[error("ntfy request failed")]
    Http(#[from] reqwest::Error),

    /// ntfy answered with a non-success status.
    #[error("ntfy returned status {0}")]
    Status(u16),
}

/// Reported as a hardware error, never a fatal one.
impl From<NotifyError> for HvacError {
    fn from(err: NotifyError) -> Self {
        Self::Hardware(Box::new(err))
    }
}
