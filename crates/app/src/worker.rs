//! Periodic worker loop shared by every controller.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use hvac_domain::error::HvacError;

use crate::ports::PowerControl;
use crate::power::ShutdownRequest;

/// One unit of periodic work.
pub trait Controller: Send + Sync {
    fn name(&self) -> &str;

    /// Run one evaluation cycle.
    ///
    /// Fatal errors stop the whole plant; any other error is logged and the
    /// next cycle runs as usual.
    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send;
}

impl<T: Controller> Controller for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run_cycle(&self) -> impl Future<Output = Result<(), HvacError>> + Send {
        (**self).run_cycle()
    }
}

/// When a worker starts and how often it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub startup_delay: Duration,
    pub interval: Duration,
    /// Upper bound of the random extra startup delay.
    pub jitter: Duration,
}

impl Schedule {
    #[must_use]
    pub fn every(interval: Duration) -> Self {
        Self {
            startup_delay: Duration::ZERO,
            interval,
            jitter: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn after(mut self, startup_delay: Duration) -> Self {
        self.startup_delay = startup_delay;
        self
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }
}

/// Run `controller` until shutdown is requested or a cycle fails fatally.
///
/// A fatal error is handed to `power` before the loop exits.
pub async fn run_periodic<C, P>(
    controller: C,
    schedule: Schedule,
    power: P,
    mut shutdown: watch::Receiver<ShutdownRequest>,
) where
    C: Controller,
    P: PowerControl,
{
    let delay = schedule.startup_delay + jitter(schedule.jitter);
    tracing::info!(
        controller = controller.name(),
        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        "worker scheduled"
    );

    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = stopped(&mut shutdown) => {
            tracing::info!(controller = controller.name(), "worker stopped before start");
            return;
        }
    }

    let mut ticker = tokio::time::interval(schedule.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            () = stopped(&mut shutdown) => break,
        }

        match controller.run_cycle().await {
            Ok(()) => {}
            Err(err) if err.is_fatal() => {
                tracing::error!(controller = controller.name(), error = %err, "fatal controller error");
                power.emergency_stop(&err).await;
                break;
            }
            Err(err) => {
                tracing::warn!(controller = controller.name(), error = %err, "controller cycle failed");
            }
        }
    }

    tracing::info!(controller = controller.name(), "worker stopped");
}

/// Resolves once the process is no longer running, or the signal is gone.
async fn stopped(shutdown: &mut watch::Receiver<ShutdownRequest>) {
    let _ = shutdown.wait_for(|request| !request.is_running()).await;
}

fn jitter(max: Duration) -> Duration {
    let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
