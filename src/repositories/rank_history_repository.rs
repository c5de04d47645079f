//! Repository for the previous rank of each product

use crate::error::RepositoryError;
use crate::models::{Rank, RankHistory};
use crate::repositories::RankHistoryStore;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct RankHistoryRepository {
    pool: PgPool,
}

impl RankHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load every stored rank
    pub async fn load_all(&self) -> Result<RankHistory, RepositoryError> {
        let rows: Vec<(String, i32)> = sqlx::query_as(
            r#"
            SELECT product_id, previous_rank
            FROM previous_ranks
            ORDER BY product_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(product_id, rank)| -> Result<(String, Rank), RepositoryError> {
                let rank = Rank::try_from(rank)
                    .ok()
                    .filter(|r| *r > 0)
                    .ok_or_else(|| {
                        RepositoryError::InvalidInput(format!(
                            "stored rank {} for product {} is not positive",
                            rank, product_id
                        ))
                    })?;
                Ok((product_id, rank))
            })
            .collect()
    }

    /// Upsert all ranks in one transaction. Each row is an
    /// `INSERT ... ON CONFLICT` so concurrent runs never interleave
    /// partial writes for a product.
    pub async fn upsert_all(&self, ranks: &RankHistory) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for (product_id, rank) in ranks.iter() {
            let stored = i32::try_from(rank)
                .ok()
                .filter(|r| *r > 0)
                .ok_or_else(|| {
                    RepositoryError::InvalidInput(format!(
                        "rank {} for product {} cannot be stored",
                        rank, product_id
                    ))
                })?;

            let result = sqlx::query(
                r#"
                INSERT INTO previous_ranks (product_id, previous_rank)
                VALUES ($1, $2)
                ON CONFLICT (product_id) DO UPDATE
                SET previous_rank = EXCLUDED.previous_rank, updated_at = NOW()
                "#,
            )
            .bind(product_id)
            .bind(stored)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected();
        }

        tx.commit().await?;

        Ok(written)
    }
}

#[async_trait]
impl RankHistoryStore for RankHistoryRepository {
    async fn load(&self) -> Result<RankHistory, RepositoryError> {
        self.load_all().await
    }

    async fn save(&self, ranks: &RankHistory) -> Result<u64, RepositoryError> {
        self.upsert_all(ranks).await
    }
}
