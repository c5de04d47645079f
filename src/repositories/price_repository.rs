//! Repository for the append-only price table

use crate::error::RepositoryError;
use crate::models::{PriceObservation, PriceRow};
use crate::repositories::PriceStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

/// Repository for price observation data access
pub struct PriceRepository {
    pool: PgPool,
}

impl PriceRepository {
    /// Create a new PriceRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most recent observed date, if any rows exist
    pub async fn latest_date(&self) -> Result<Option<NaiveDate>, RepositoryError> {
        let (date,): (Option<NaiveDate>,) =
            sqlx::query_as("SELECT MAX(observed_date) FROM price_observations")
                .fetch_one(&self.pool)
                .await?;

        Ok(date)
    }

    /// Rows for the most recent observed date
    pub async fn find_latest(&self) -> Result<Vec<PriceRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT id, product_id, product_name, seller, price, source, observed_date
            FROM price_observations
            WHERE observed_date = (SELECT MAX(observed_date) FROM price_observations)
            ORDER BY product_id, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// All rows for one product, oldest first
    pub async fn find_by_product(&self, product_id: &str) -> Result<Vec<PriceRow>, RepositoryError> {
        let rows = sqlx::query_as::<_, PriceRow>(
            r#"
            SELECT id, product_id, product_name, seller, price, source, observed_date
            FROM price_observations
            WHERE product_id = $1
            ORDER BY observed_date, id
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Insert a single observation
    pub async fn insert(&self, observation: &PriceObservation) -> Result<i64, RepositoryError> {
        validate(observation)?;

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO price_observations (product_id, product_name, seller, price, source, observed_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&observation.product_id)
        .bind(&observation.product_name)
        .bind(&observation.seller)
        .bind(observation.price.to_stored())
        .bind(observation.source.as_str())
        .bind(observation.observed_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Insert a batch of observations in one transaction
    pub async fn insert_batch(&self, observations: &[PriceObservation]) -> Result<u64, RepositoryError> {
        for observation in observations {
            validate(observation)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for observation in observations {
            let result = sqlx::query(
                r#"
                INSERT INTO price_observations (product_id, product_name, seller, price, source, observed_date)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(&observation.product_id)
            .bind(&observation.product_name)
            .bind(&observation.seller)
            .bind(observation.price.to_stored())
            .bind(observation.source.as_str())
            .bind(observation.observed_date)
            .execute(&mut *tx)
            .await?;

            inserted += result.rows_affected();
        }

        tx.commit().await?;

        Ok(inserted)
    }
}

fn validate(observation: &PriceObservation) -> Result<(), RepositoryError> {
    if observation.product_id.trim().is_empty() {
        return Err(RepositoryError::InvalidInput("product id must not be empty".to_string()));
    }
    if observation.seller.trim().is_empty() {
        return Err(RepositoryError::InvalidInput(format!(
            "seller must not be empty (product {})",
            observation.product_id
        )));
    }
    Ok(())
}

#[async_trait]
impl PriceStore for PriceRepository {
    async fn fetch_latest(&self) -> Result<Vec<PriceObservation>, RepositoryError> {
        let rows = self.find_latest().await?;
        Ok(rows.into_iter().map(PriceObservation::from).collect())
    }

    async fn append(&self, observations: &[PriceObservation]) -> Result<u64, RepositoryError> {
        self.insert_batch(observations).await
    }
}
