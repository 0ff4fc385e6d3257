//! Metrics port — gauges for an external time-series backend.

use std::future::Future;

use hvac_domain::error::HvacError;

pub trait MetricsSink: Send + Sync {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send;
}

impl<T: MetricsSink> MetricsSink for std::sync::Arc<T> {
    fn gauge(
        &self,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).gauge(name, value, tags)
    }
}

/// Drops every gauge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl MetricsSink for NoMetrics {
    fn gauge(
        &self,
        _name: &str,
        _value: f64,
        _tags: &[String],
    ) -> impl Future<Output = Result<(), HvacError>> + Send {
        async { Ok(()) }
    }
}
