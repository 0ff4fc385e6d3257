//! Notifier port — push messages to the homeowner.

use std::future::Future;

use hvac_domain::error::HvacError;

pub trait Notifier: Send + Sync {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send;
}

impl<T: Notifier> Notifier for std::sync::Arc<T> {
    fn send(&self, title: &str, message: &str) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).send(title, message)
    }
}
