use crate::error::RepositoryError;
use crate::models::{PriceObservation, RankHistory};
use async_trait::async_trait;

/// Read/append access to the price table
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// All observations of the most recent observed date, ordered by
    /// product id and then insertion order. Empty when the store is empty.
    async fn fetch_latest(&self) -> Result<Vec<PriceObservation>, RepositoryError>;

    /// Append observations; existing rows are never touched
    async fn append(&self, observations: &[PriceObservation]) -> Result<u64, RepositoryError>;
}

/// Persisted previous rank per product
#[async_trait]
pub trait RankHistoryStore: Send + Sync {
    async fn load(&self) -> Result<RankHistory, RepositoryError>;

    /// Upsert every entry. Products not in `ranks` keep their stored value.
    async fn save(&self, ranks: &RankHistory) -> Result<u64, RepositoryError>;
}
