use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use sprout_garden::{schedule::register_care_schedule, CareEngine, LogAlertSink, PlantStore, SqlitePlantStore};
use sprout_scheduler::{RetryPolicy, SchedulerEngine, SchedulerHandle};
use tracing::info;

mod app;
mod http;
mod worker;

/// Plant care scheduler: durable recurring and delayed care jobs over SQLite.
#[derive(Parser)]
#[command(name = "sprout-gateway", version)]
struct Cli {
    /// Config file (default: $SPROUT_CONFIG, then ~/.sprout/sprout.toml).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sprout_gateway=info,sprout_garden=info,sprout_scheduler=info,sprout=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    // load config: --config > SPROUT_CONFIG env > ~/.sprout/sprout.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("SPROUT_CONFIG").ok());
    let config = sprout_core::config::SproutConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            tracing::warn!("Config load failed ({}), using defaults", e);
            sprout_core::config::SproutConfig::default()
        });

    // initialize SQLite database — one file for jobs and plants
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = open_db(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    sprout_scheduler::db::init_db(&db)?;
    sprout_garden::db::init_db(&db)?;
    info!("database migrations complete");

    // each subsystem gets its own connection
    let scheduler =
        SchedulerHandle::new(open_db(db_path)?)?.with_retry_policy(RetryPolicy::from(&config.scheduler));
    let store: Arc<dyn PlantStore> = Arc::new(SqlitePlantStore::new(open_db(db_path)?)?);
    let engine = Arc::new(CareEngine::new(
        Arc::clone(&store),
        Arc::new(scheduler.clone()),
        Arc::new(LogAlertSink),
        &config.care,
    ));

    register_care_schedule(&scheduler, &config.care)?;

    // Fired-job channel: SchedulerEngine → worker pool
    let (fired_tx, fired_rx) = tokio::sync::mpsc::channel(config.scheduler.queue_capacity.max(1));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let scheduler_engine =
        SchedulerEngine::new(scheduler.clone(), fired_tx, config.scheduler.poll_interval());
    let engine_task = tokio::spawn(async move { scheduler_engine.run(shutdown_rx).await });
    let workers = tokio::spawn(worker::run_workers(
        fired_rx,
        engine,
        scheduler.clone(),
        config.scheduler.workers,
    ));

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let state = Arc::new(app::AppState::new(config, scheduler, store));
    let router = app::build_router(state);

    info!("Sprout gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // stop polling, then let in-flight jobs drain (the engine owns the sender)
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    let _ = workers.await;
    info!("Sprout gateway stopped");
    Ok(())
}

fn open_db(path: &str) -> rusqlite::Result<rusqlite::Connection> {
    let conn = rusqlite::Connection::open(path)?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
