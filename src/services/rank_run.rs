use crate::error::{AppError, AppResult};
use crate::models::RankChangeEvent;
use crate::repositories::{PriceStore, RankHistoryStore};
use crate::services::audit::RunAuditLog;
use crate::services::change_detector::detect_changes;
use crate::services::notifier::Notifier;
use crate::services::rank_calculator::RankCalculator;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What happened to the change batch of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationOutcome {
    /// No rank changed, nothing was sent
    NotNeeded,
    Sent { notifier: String, events: usize },
    Failed { notifier: String, reason: String },
}

/// Result of one rank run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub observed_date: Option<NaiveDate>,
    pub observations_read: usize,
    pub products_ranked: usize,
    pub unranked_products: Vec<String>,
    pub events: Vec<RankChangeEvent>,
    pub notification: NotificationOutcome,
    pub history_rows_written: u64,
}

/// Runs one pass of: read latest prices, rank, diff against history,
/// notify, persist.
pub struct RankRunService {
    price_store: Arc<dyn PriceStore>,
    history_store: Arc<dyn RankHistoryStore>,
    notifier: Arc<dyn Notifier>,
    calculator: RankCalculator,
    audit_log: Option<Arc<RunAuditLog>>,
}

impl RankRunService {
    pub fn new(
        price_store: Arc<dyn PriceStore>,
        history_store: Arc<dyn RankHistoryStore>,
        notifier: Arc<dyn Notifier>,
        calculator: RankCalculator,
    ) -> Self {
        Self {
            price_store,
            history_store,
            notifier,
            calculator,
            audit_log: None,
        }
    }

    /// Record every completed run in an audit log
    pub fn with_audit_log(mut self, audit_log: Arc<RunAuditLog>) -> Self {
        self.audit_log = Some(audit_log);
        self
    }

    /// Execute a single rank run.
    ///
    /// Store read and history load failures abort before anything is
    /// written. A notifier failure is logged and the new ranks are still
    /// persisted.
    pub async fn run(&self) -> AppResult<RunSummary> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting rank run {} for seller {:?}", run_id, self.calculator.our_company());

        let observations = self.price_store.fetch_latest().await.map_err(|e| {
            error!("Failed to read latest prices: {}", e);
            AppError::PriceStore(e.to_string())
        })?;

        if observations.is_empty() {
            warn!("Price store has no observations, nothing to rank");
        }

        let snapshot = self.calculator.compute(&observations);
        info!(
            "Ranked {} products from {} observations (date: {})",
            snapshot.len(),
            observations.len(),
            snapshot
                .observed_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "none".to_string())
        );

        if !snapshot.unranked().is_empty() {
            warn!(
                "No valid {} price for products {:?}; they are left out of this run",
                self.calculator.our_company(),
                snapshot.unranked()
            );
        }

        let previous = self.history_store.load().await.map_err(|e| {
            error!("Failed to load previous ranks: {}", e);
            AppError::RankHistory(e.to_string())
        })?;

        let events = detect_changes(&snapshot, &previous);

        let notification = if events.is_empty() {
            info!("No rank changes detected");
            NotificationOutcome::NotNeeded
        } else {
            info!("Detected {} rank changes, notifying via {}", events.len(), self.notifier.name());
            match self.notifier.notify(&events).await {
                Ok(()) => NotificationOutcome::Sent {
                    notifier: self.notifier.name().to_string(),
                    events: events.len(),
                },
                Err(e) => {
                    error!("Notification failed, rank history will still be updated: {}", e);
                    NotificationOutcome::Failed {
                        notifier: self.notifier.name().to_string(),
                        reason: e.to_string(),
                    }
                }
            }
        };

        let current = snapshot.ranks();
        let history_rows_written = self.history_store.save(&current).await.map_err(|e| {
            error!("Failed to persist ranks: {}", e);
            AppError::RankHistory(e.to_string())
        })?;
        info!("Persisted {} ranks", current.len());

        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            observed_date: snapshot.observed_date,
            observations_read: observations.len(),
            products_ranked: snapshot.len(),
            unranked_products: snapshot.unranked().to_vec(),
            events,
            notification,
            history_rows_written,
        };

        if let Some(audit_log) = &self.audit_log {
            if let Err(e) = audit_log.log_run(&summary).await {
                warn!("Could not write rank run audit entry: {}", e);
            }
        }

        Ok(summary)
    }
}
