pub mod audit;
pub mod change_detector;
pub mod notifier;
pub mod rank_calculator;
pub mod rank_run;
pub mod recorder;

pub use audit::RunAuditLog;
pub use change_detector::detect_changes;
pub use notifier::{build_notifier, LogNotifier, MessageTemplate, Notifier, NotifierError, WebhookNotifier};
pub use rank_calculator::RankCalculator;
pub use rank_run::{NotificationOutcome, RankRunService, RunSummary};
pub use recorder::{ListedProduct, ObservationRecorder, ScrapedOffer};
