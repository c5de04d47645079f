#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use price_rank_monitor::error::RepositoryError;
use price_rank_monitor::models::*;
use price_rank_monitor::repositories::{PriceStore, RankHistoryStore};
use price_rank_monitor::services::{Notifier, NotifierError, RankCalculator, RankRunService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const OURS: &str = "Our company";

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, day).expect("valid test date")
}

/// Observation on the given day of January 2025
pub fn obs(product_id: &str, seller: &str, price: &str, day: u32) -> PriceObservation {
    let source = if seller == OURS { Source::OurCompany } else { Source::Idealo };
    PriceObservation::new(
        product_id,
        format!("Product {}", product_id),
        seller,
        Price::parse(price),
        date(day),
        source,
    )
}

pub fn history(ranks: &[(&str, Rank)]) -> RankHistory {
    ranks.iter().map(|(id, rank)| (id.to_string(), *rank)).collect()
}

fn unavailable() -> RepositoryError {
    RepositoryError::Query(sqlx::Error::PoolTimedOut)
}

/// Price store backed by a vector, mimicking the latest-date query
#[derive(Default)]
pub struct InMemoryPriceStore {
    rows: Mutex<Vec<PriceObservation>>,
    fail_reads: bool,
}

impl InMemoryPriceStore {
    pub fn new(rows: Vec<PriceObservation>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fail_reads: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_reads: true,
        }
    }

    pub fn all(&self) -> Vec<PriceObservation> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceStore for InMemoryPriceStore {
    async fn fetch_latest(&self) -> Result<Vec<PriceObservation>, RepositoryError> {
        if self.fail_reads {
            return Err(unavailable());
        }

        let rows = self.rows.lock().unwrap();
        let latest = match rows.iter().map(|o| o.observed_date).max() {
            Some(latest) => latest,
            None => return Ok(Vec::new()),
        };

        let mut selected: Vec<PriceObservation> = rows
            .iter()
            .filter(|o| o.observed_date == latest)
            .cloned()
            .collect();
        selected.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        Ok(selected)
    }

    async fn append(&self, observations: &[PriceObservation]) -> Result<u64, RepositoryError> {
        if self.fail_reads {
            return Err(unavailable());
        }
        self.rows.lock().unwrap().extend_from_slice(observations);
        Ok(observations.len() as u64)
    }
}

/// Rank history held in memory with upsert semantics
#[derive(Default)]
pub struct InMemoryRankHistory {
    ranks: Mutex<RankHistory>,
    fail_load: bool,
    fail_save: bool,
    saves: AtomicUsize,
}

impl InMemoryRankHistory {
    pub fn new(initial: RankHistory) -> Self {
        Self {
            ranks: Mutex::new(initial),
            ..Self::default()
        }
    }

    pub fn failing_load(initial: RankHistory) -> Self {
        Self {
            ranks: Mutex::new(initial),
            fail_load: true,
            ..Self::default()
        }
    }

    pub fn failing_save(initial: RankHistory) -> Self {
        Self {
            ranks: Mutex::new(initial),
            fail_save: true,
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> RankHistory {
        self.ranks.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RankHistoryStore for InMemoryRankHistory {
    async fn load(&self) -> Result<RankHistory, RepositoryError> {
        if self.fail_load {
            return Err(unavailable());
        }
        Ok(self.ranks.lock().unwrap().clone())
    }

    async fn save(&self, ranks: &RankHistory) -> Result<u64, RepositoryError> {
        if self.fail_save {
            return Err(unavailable());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.ranks.lock().unwrap().upsert_all(ranks);
        Ok(ranks.len() as u64)
    }
}

/// Notifier that remembers every batch it was handed
#[derive(Default)]
pub struct RecordingNotifier {
    batches: Mutex<Vec<Vec<RankChangeEvent>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<RankChangeEvent>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, events: &[RankChangeEvent]) -> Result<(), NotifierError> {
        self.batches.lock().unwrap().push(events.to_vec());
        if self.fail {
            return Err(NotifierError::Transport("relay unreachable".to_string()));
        }
        Ok(())
    }
}

/// Test harness wiring a rank run against in-memory collaborators
pub struct TestRun {
    pub prices: Arc<InMemoryPriceStore>,
    pub history: Arc<InMemoryRankHistory>,
    pub notifier: Arc<RecordingNotifier>,
    pub service: RankRunService,
}

impl TestRun {
    pub fn new(
        prices: InMemoryPriceStore,
        history: InMemoryRankHistory,
        notifier: RecordingNotifier,
    ) -> Self {
        let prices = Arc::new(prices);
        let history = Arc::new(history);
        let notifier = Arc::new(notifier);
        let service = RankRunService::new(
            prices.clone(),
            history.clone(),
            notifier.clone(),
            RankCalculator::new(OURS),
        );

        Self {
            prices,
            history,
            notifier,
            service,
        }
    }
}
