use std::{
    sync::{Mutex, OnceLock, PoisonError},
    time::Instant,
};

use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self as tracing_fmt, time::UtcTime},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use vaxtrack_util::{AppConfig, Environment};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

static TRACING_READY: OnceLock<()> = OnceLock::new();
static RECORDER: Mutex<Option<PrometheusHandle>> = Mutex::new(None);
static STARTED_AT: OnceLock<Instant> = OnceLock::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize tracing: {0}")]
    Tracing(#[from] TryInitError),
    #[error("failed to install prometheus recorder: {0}")]
    Metrics(#[from] BuildError),
}

fn git_sha() -> &'static str {
    option_env!("GIT_SHA").unwrap_or("unknown")
}

/// Installs the global subscriber: pretty lines locally, JSON lines in production.
pub fn init_tracing(config: &AppConfig) -> Result<(), TelemetryError> {
    if TRACING_READY.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let base = tracing_fmt::layer()
        .with_target(false)
        .with_timer(UtcTime::rfc_3339());
    let output = match config.environment {
        Environment::Production => base.json().boxed(),
        Environment::Development | Environment::Test => base.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;
    TRACING_READY.set(()).ok();

    tracing::info!(
        stage = "telemetry",
        env = config.environment.as_str(),
        version = BUILD_VERSION,
        git_sha = git_sha(),
        "tracing initialized"
    );
    Ok(())
}

/// Installs the Prometheus recorder once and returns its handle on every call.
pub fn init_metrics() -> Result<PrometheusHandle, TelemetryError> {
    let mut recorder = RECORDER.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(handle) = recorder.as_ref() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    STARTED_AT.get_or_init(Instant::now);
    gauge!("app_build_info", "version" => BUILD_VERSION, "git" => git_sha()).set(1.0);

    *recorder = Some(handle.clone());
    Ok(handle)
}

fn describe_metrics() {
    describe_gauge!("app_build_info", "Build metadata for the running binary");
    describe_gauge!("app_uptime_seconds", "Seconds since the metrics recorder was installed");
    describe_counter!(
        "api_requests_total",
        "Count of API requests, labelled by route and result"
    );
    describe_counter!(
        "schedule_doses_generated_total",
        "Count of doses generated from national guidelines for new children"
    );
    describe_counter!(
        "record_status_sync_total",
        "Count of stored record statuses refreshed by the reminder worker, labelled by status"
    );
    describe_counter!(
        "reminders_created_total",
        "Count of reminders created by the reminder worker, labelled by kind"
    );
    describe_histogram!("reminder_sweep_seconds", "Duration of reminder sweeps in seconds");
}

/// Renders the exposition text after refreshing the uptime gauge.
pub fn render_metrics(handle: &PrometheusHandle) -> String {
    if let Some(started_at) = STARTED_AT.get() {
        gauge!("app_uptime_seconds").set(started_at.elapsed().as_secs_f64());
    }
    handle.render()
}
