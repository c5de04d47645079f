//! Price Rank Monitor Library
//!
//! Computes our market rank per product from the latest scraped prices,
//! compares it with the previous run and reports rank changes.

pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod repositories;
pub mod services;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};

use database::Database;
use repositories::*;
use services::{build_notifier, RankCalculator, RankRunService, RunAuditLog};
use std::sync::Arc;

/// Application state containing all repositories
pub struct AppState {
    pub database: Database,
    pub price_repo: Arc<PriceRepository>,
    pub rank_history_repo: Arc<RankHistoryRepository>,
}

impl AppState {
    /// Create a new AppState with initialized repositories
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            database: Database::new(pool.clone()),
            price_repo: Arc::new(PriceRepository::new(pool.clone())),
            rank_history_repo: Arc::new(RankHistoryRepository::new(pool)),
        }
    }

    /// Wire the rank run against the database stores and the configured
    /// notifier and audit log
    pub fn rank_run_service(&self, config: &AppConfig) -> AppResult<RankRunService> {
        let notifier = build_notifier(&config.notifier)
            .map_err(|e| AppError::Config(e.to_string()))?;

        let service = RankRunService::new(
            self.price_repo.clone(),
            self.rank_history_repo.clone(),
            notifier,
            RankCalculator::new(config.our_company.clone()),
        );

        match &config.audit_log_dir {
            Some(dir) => Ok(service.with_audit_log(Arc::new(RunAuditLog::new(dir)?))),
            None => Ok(service),
        }
    }
}
