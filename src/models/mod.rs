//! Domain models for the price rank monitor.
//!
//! Price observations come from the price store; rank snapshots, rank
//! history and change events are derived from them on each run.

pub mod price_observation;
pub mod rank;

// Re-export all models for convenient access
pub use price_observation::{Price, PriceObservation, PriceRow, Source};
pub use rank::{Rank, RankChangeEvent, RankHistory, RankSnapshot, RankedProduct};
