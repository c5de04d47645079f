//! Price Rank Monitor
//!
//! Single-pass batch job meant to be started by an external scheduler:
//! - reads the latest day's prices from the price store
//! - ranks our company per product and compares with the previous run
//! - notifies about rank changes and stores the new ranks

use price_rank_monitor::config::AppConfig;
use price_rank_monitor::database::{create_pool, run_migrations};
use price_rank_monitor::error::{AppError, AppResult};
use price_rank_monitor::services::{NotificationOutcome, RunSummary};
use price_rank_monitor::AppState;
use tracing::{error, info, warn};

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("price_rank_monitor={},sqlx=warn", config.log_level).into()
    });

    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: &AppConfig) -> AppResult<RunSummary> {
    info!("Connecting to database...");

    let pool = create_pool(&config.database).await.map_err(|e| {
        error!("Failed to create database pool: {}", e);
        AppError::Database(e)
    })?;

    info!("Running database migrations...");
    run_migrations(&pool, Some(&config.migrations_path)).await.map_err(|e| {
        error!("Database migration failed: {}", e);
        AppError::Database(e)
    })?;

    let app_state = AppState::new(pool);
    let service = app_state.rank_run_service(config)?;

    let result = service.run().await;
    app_state.database.close().await;
    result
}

#[tokio::main]
async fn main() {
    // Load environment variables first
    dotenv::dotenv().ok();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(AppError::Config(e).exit_code());
        }
    };

    init_tracing(&config);

    info!("Price rank monitor starting");
    info!("Environment: {}", config.environment);
    info!("Tracking seller: {}", config.our_company);
    info!("Notifier: {}", config.notifier.kind.as_str());

    let started = std::time::Instant::now();

    match run(&config).await {
        Ok(summary) => {
            if let NotificationOutcome::Failed { reason, .. } = &summary.notification {
                warn!("Rank changes were not delivered: {}", reason);
            }
            info!(
                "Rank run {} completed: {} products ranked, {} rank changes, took {:.2}s",
                summary.run_id,
                summary.products_ranked,
                summary.events.len(),
                started.elapsed().as_secs_f64()
            );
        }
        Err(e) => {
            error!("Rank run failed: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
