//! # hvacd — multi-zone HVAC controller daemon
//!
//! Composition root that wires all adapters together, runs the controllers
//! and serves the status API.
//!
//! ## Responsibilities
//! - Load configuration (`hvac.toml`, env vars) and initialise logging
//! - Open the `SQLite` store, run migrations and seed it on first boot
//! - Pick the pin, probe, alert and metrics backends
//! - Verify every relay rests in its expected state, then close the main
//!   power relay
//! - Spawn the temperature service and the controllers as periodic workers
//! - Serve the axum router until SIGINT/SIGTERM or a fatal stop
//! - Open the main power relay on the way out
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;
mod hardware;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use hvac_adapter_http_axum::router;
use hvac_adapter_http_axum::state::AppState;
use hvac_adapter_storage_sqlite_sqlx::device_repo::SqliteDeviceRepository;
use hvac_adapter_storage_sqlite_sqlx::pool;
use hvac_adapter_storage_sqlite_sqlx::seed::seed;
use hvac_adapter_storage_sqlite_sqlx::sensor_repo::SqliteSensorRepository;
use hvac_adapter_storage_sqlite_sqlx::system_repo::SqliteSystemRepository;
use hvac_adapter_storage_sqlite_sqlx::zone_repo::SqliteZoneRepository;
use hvac_app::actuator::PinActuator;
use hvac_app::controllers::{
    FailsafeController, HeatSourceController, RecirculationController, ZoneController,
};
use hvac_app::equipment::AirHandlerTiming;
use hvac_app::ports::{SystemRepository, ZoneRepository};
use hvac_app::power::{MainPower, ShutdownRequest, check_startup_pins, rest_all_pins};
use hvac_app::services::system_service::SystemService;
use hvac_app::services::temperature_service::TemperatureService;
use hvac_app::services::zone_service::ZoneService;
use hvac_app::worker::run_periodic;
use hvac_domain::recirculation::RecirculationPolicy;
use hvac_domain::time::now;

use crate::config::Config;
use crate::hardware::{Alerts, Metrics, Pins, Probes};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("hvacd: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    match run(config).await {
        Ok(ShutdownRequest::Fatal(reason)) => {
            tracing::error!(%reason, "hvacd stopped after a fatal error");
            ExitCode::FAILURE
        }
        Ok(_) => {
            tracing::info!("hvacd stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = ?err, "hvacd failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<ShutdownRequest> {
    // Database
    let db = pool::Config {
        database_url: config.database.url.clone(),
    }
    .build()
    .await
    .context("failed to open the database")?;
    let pool = db.pool().clone();

    let plant = config.seed(now())?;
    if seed(&pool, &plant).await.context("failed to seed the database")? {
        tracing::info!(
            zones = plant.zones.len(),
            sensors = plant.sensors.len(),
            "store seeded from configuration"
        );
    }

    // Repositories
    let system = Arc::new(SqliteSystemRepository::new(pool.clone()));
    let zones = Arc::new(SqliteZoneRepository::new(pool.clone()));
    let devices = Arc::new(SqliteDeviceRepository::new(pool.clone()));
    let sensors = Arc::new(SqliteSensorRepository::new(pool));

    let zone_ids: Vec<_> = zones.get_all().await?.into_iter().map(|z| z.id).collect();
    let alerts = Alerts::from_config(&config.notifications)?;
    let metrics = Metrics::from_config(&config.metrics)
        .await
        .context("failed to set up statsd metrics")?;
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "hvacd listening");

    // Hardware
    let pins = Arc::new(Pins::from_config(&config.hardware));
    if pins.as_virtual().is_some() {
        rest_all_pins(&pins, &system, &devices).await?;
    }
    check_startup_pins(&pins, &system, &devices)
        .await
        .context("refusing to energize the relay board")?;

    let state = system.get().await?;
    tracing::info!(mode = %state.mode, override_active = state.override_active, "loaded system state");
    let power = Arc::new(MainPower::new(Arc::clone(&pins), state.main_power_pin));
    if let Err(err) = power.energize().await {
        power.shutdown().await;
        return Err(err).context("failed to energize the main power relay");
    }

    // Services
    let temperatures = Arc::new(
        TemperatureService::new(
            Arc::clone(&zones),
            Arc::clone(&sensors),
            Probes::from_config(&config.hardware),
            alerts,
            config.temperature_settings(),
        )
        .with_metrics(metrics),
    );
    let actuator = Arc::new(PinActuator::new(Arc::clone(&pins), Arc::clone(&devices)));
    let timing = AirHandlerTiming::default();
    let schedules = config.polling.schedules();

    // Workers
    let mut workers = JoinSet::new();
    workers.spawn(run_periodic(
        Arc::clone(&temperatures),
        schedules.temperature,
        Arc::clone(&power),
        power.subscribe(),
    ));
    workers.spawn(run_periodic(
        HeatSourceController::new(
            Arc::clone(&system),
            Arc::clone(&devices),
            Arc::clone(&actuator),
            Arc::clone(&temperatures),
            config.heat_source_settings(),
        ),
        schedules.heat_source,
        Arc::clone(&power),
        power.subscribe(),
    ));
    for zone_id in zone_ids {
        workers.spawn(run_periodic(
            ZoneController::new(
                zone_id,
                Arc::clone(&system),
                Arc::clone(&zones),
                Arc::clone(&devices),
                Arc::clone(&actuator),
                Arc::clone(&temperatures),
                timing,
            ),
            schedules.zone,
            Arc::clone(&power),
            power.subscribe(),
        ));
    }
    workers.spawn(run_periodic(
        RecirculationController::new(
            Arc::clone(&system),
            Arc::clone(&zones),
            Arc::clone(&devices),
            Arc::clone(&actuator),
            RecirculationPolicy::default(),
            timing,
        ),
        schedules.recirculation,
        Arc::clone(&power),
        power.subscribe(),
    ));
    workers.spawn(run_periodic(
        FailsafeController::new(
            Arc::clone(&system),
            Arc::clone(&zones),
            Arc::clone(&devices),
            Arc::clone(&actuator),
            Arc::clone(&temperatures),
            config.failsafe.clone(),
            timing,
        ),
        schedules.failsafe,
        Arc::clone(&power),
        power.subscribe(),
    ));
    tracing::info!(workers = workers.len(), "controllers scheduled");

    // HTTP
    let app_state = AppState::new(
        SystemService::new(Arc::clone(&system), Arc::clone(&temperatures)),
        ZoneService::new(
            Arc::clone(&zones),
            Arc::clone(&devices),
            Arc::clone(&temperatures),
            config.zone_limits(),
        ),
        Arc::clone(&temperatures),
    );
    let app = router::build(app_state);

    let mut stop = power.subscribe();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                () = shutdown_signal() => tracing::info!("shutdown signal received"),
                _ = stop.wait_for(|request| !request.is_running()) => {}
            }
        })
        .await;

    power.shutdown().await;
    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            tracing::error!(error = %err, "worker task failed");
        }
    }
    served.context("http server failed")?;

    let outcome = power.subscribe().borrow().clone();
    Ok(outcome)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
