use mimalloc::MiMalloc;
use student_records::RecordsError;
use student_records::db::{Backend, executor_for};
use student_records::router::{RecordsState, records_router};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = &student_records::config::CONFIG;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    let backend = Backend::select(cfg);
    info!(
        backend = %backend,
        listen_addr = %cfg.listen_addr,
        loglevel = %cfg.loglevel,
        app_env = %cfg.app_env.as_deref().unwrap_or("<unset>"),
        managed_platform = cfg.on_managed_platform(),
        sqlite_path = %cfg.sqlite_path.display()
    );

    let db = executor_for(cfg);
    let state = RecordsState::new(db.clone(), (**cfg).clone())?;

    match state.bootstrap.ensure().await {
        Ok(seed) => info!(?seed, "database initialized"),
        Err(e @ (RecordsError::MissingDatabaseUrl | RecordsError::EmbeddedUnavailable { .. })) => {
            error!(error = %e, "database backend cannot start");
            return Err(e.into());
        }
        Err(e) => {
            warn!(error = %e, "database initialization failed; will retry on first request");
        }
    }

    let app = records_router(state);
    let listener = TcpListener::bind(cfg.listen_addr.as_str()).await?;
    info!("HTTP server listening on {}", cfg.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db.close().await;
    info!("server shut down");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
