use crate::error::{map_to_app_error, AppError, AppResult};
use crate::services::rank_run::RunSummary;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

/// Audit log entry, one JSON line per rank run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub timestamp: i64,
    pub entry_type: String,
    pub details: serde_json::Value,
}

/// Append-only JSON-lines record of rank runs
pub struct RunAuditLog {
    log_file: PathBuf,
    file_handle: Arc<Mutex<std::fs::File>>,
}

impl RunAuditLog {
    /// Open (or create) the current month's audit file under `log_directory`
    pub fn new(log_directory: impl AsRef<Path>) -> AppResult<Self> {
        let log_directory = log_directory.as_ref();

        std::fs::create_dir_all(log_directory)
            .map_err(|e| AppError::Message(format!("Failed to create log directory: {}", e)))?;

        let month = chrono::Utc::now().format("%Y-%m");
        let log_file = log_directory.join(format!("rank_runs_{}.log", month));

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .map_err(|e| AppError::Message(format!("Failed to open audit log file: {}", e)))?;

        info!("Rank run audit log: {:?}", log_file);

        Ok(Self {
            log_file,
            file_handle: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_file
    }

    /// Log an audit entry
    pub async fn log(&self, entry: AuditLogEntry) -> AppResult<()> {
        let json = serde_json::to_string(&entry)?;

        let mut file = self.file_handle.lock().await;
        map_to_app_error(writeln!(file, "{}", json), "Failed to write audit log")?;
        map_to_app_error(file.flush(), "Failed to flush audit log")?;

        Ok(())
    }

    /// Log the outcome of a completed rank run
    pub async fn log_run(&self, summary: &RunSummary) -> AppResult<()> {
        let entry = AuditLogEntry {
            timestamp: summary.finished_at.timestamp(),
            entry_type: "rank_run".to_string(),
            details: serde_json::to_value(summary)?,
        };

        self.log(entry).await
    }
}
