mod api;
mod clock;
mod problem;
mod reminders;
mod router;
mod state;
mod telemetry;

use std::net::SocketAddr;

use tracing::info;
use vaxtrack_storage::Database;
use vaxtrack_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let database = Database::connect(&config.database_url).await?;
    database.run_migrations().await?;
    info!(stage = "storage", url = %config.database_url, "database ready");

    reminders::ReminderWorker::new(database.clone(), config.reminder_interval).spawn();
    info!(
        stage = "reminders",
        interval_secs = config.reminder_interval.as_secs(),
        "reminder worker started"
    );

    let state = router::AppState::new(metrics, database);

    let addr: SocketAddr = config.bind_addr;
    info!(stage = "app", %addr, env = %config.environment.as_str(), "starting HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
