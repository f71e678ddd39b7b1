//! Deploy-time initializer: creates the tables and the default admin on the
//! configured backend, then exits. A non-zero exit fails the deploy.

use std::process::ExitCode;
use student_records::db::bootstrap;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cfg = &student_records::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match bootstrap::initialize_from_config(cfg).await {
        Ok(seed) => {
            info!(?seed, "database initialized");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "failed to initialize database");
            ExitCode::FAILURE
        }
    }
}
