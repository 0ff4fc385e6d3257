//! Power port — controlled shutdown of the whole plant.

use std::future::Future;

use hvac_domain::error::HvacError;

/// Called by workers when a cycle fails with an unrecoverable error.
///
/// Implementations de-energize the main power relay and ask the process to
/// exit. The call itself cannot fail: every step is best effort.
pub trait PowerControl: Send + Sync {
    fn emergency_stop(&self, reason: &HvacError) -> impl Future<Output = ()> + Send;
}

impl<T: PowerControl> PowerControl for std::sync::Arc<T> {
    fn emergency_stop(&self, reason: &HvacError) -> impl Future<Output = ()> + Send {
        (**self).emergency_stop(reason)
    }
}
