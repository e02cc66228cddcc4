//! Orchestrator server binary. Grounded on the teacher's
//! `bin/orchestrator-server.rs` for the overall shape (tracing init →
//! config load → db connect/migrate/health-check → router build →
//! graceful shutdown), trimmed of the SSL/LDAP/security-state setup this
//! service has no use for and extended with the worktree health checker
//! and interrupted-workflow recovery pass spec.md requires at startup.

use std::sync::Arc;
use std::time::Duration;

use conductor::api::routes::AppState;
use conductor::api::create_router;
use conductor::bus::{ConnectionManager, EventBus};
use conductor::config::ServerConfig;
use conductor::db::connection::DatabaseConnection;
use conductor::graph::WsGraphExecutorFactory;
use conductor::health::WorktreeHealthChecker;
use conductor::orchestrator::Orchestrator;
use conductor::ws::WsState;

const SHUTDOWN_TASK_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    tracing::info!("loading server configuration");
    let config = ServerConfig::load().map_err(|err| {
        format!("configuration required: {err}. Set CONFIG_PATH or place conductord.toml in the working directory")
    })?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        max_concurrent = config.orchestrator.max_concurrent,
        "configuration loaded"
    );

    let database_url = config.database_url();
    tracing::info!(database_url = %database_url, "connecting to database");
    let db = DatabaseConnection::new(&database_url).await?;

    tracing::info!("running database migrations");
    db.run_migrations().await?;
    db.health_check().await?;

    let connections = Arc::new(ConnectionManager::new());
    let event_bus = Arc::new(EventBus::new(Some(connections.clone())));
    let graph_factory = Arc::new(WsGraphExecutorFactory::new(config.orchestrator.graph_executor_url.clone()));

    let orchestrator = Arc::new(Orchestrator::new(
        db.pool().clone(),
        event_bus,
        graph_factory,
        config.orchestrator.max_concurrent,
        config.orchestrator.retry.clone(),
    ));

    tracing::info!("recovering workflows interrupted by a prior shutdown");
    orchestrator.recover_interrupted_workflows().await?;

    let health_checker = Arc::new(WorktreeHealthChecker::new(orchestrator.clone(), config.check_interval()));
    health_checker.start();

    let app_state = AppState { db: db.clone(), orchestrator: orchestrator.clone() };
    let ws_state = WsState::new(connections, db.pool().clone()).with_ping_interval(config.ping_interval());
    let app = create_router(app_state, ws_state);

    tracing::info!(listen_addr = %config.listen_addr, "starting conductord");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;

    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("shutting down, cancelling active workflow tasks");
    health_checker.stop();
    orchestrator.cancel_all(SHUTDOWN_TASK_TIMEOUT).await;

    tracing::info!("conductord shut down gracefully");
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received CTRL-C, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
