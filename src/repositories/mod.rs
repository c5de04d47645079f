pub mod price_repository;
pub mod rank_history_repository;
pub mod traits;

// Re-export all repositories for convenient access
pub use price_repository::PriceRepository;
pub use rank_history_repository::RankHistoryRepository;
pub use traits::{PriceStore, RankHistoryStore};
