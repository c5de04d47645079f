//! Rank snapshots, persisted rank history and rank change events

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 1-based position by ascending price
pub type Rank = u32;

/// Our company's standing for one product on the snapshot date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedProduct {
    pub product_id: String,
    pub product_name: String,
    pub rank: Rank,
    pub our_price: Decimal,
    /// Number of sellers with a valid price for this product
    pub seller_count: usize,
}

/// Ranks computed from one day's observations, keyed by product id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub observed_date: Option<NaiveDate>,
    entries: BTreeMap<String, RankedProduct>,
    /// Products with valid competitor prices but no valid price of ours
    unranked: Vec<String>,
}

impl RankSnapshot {
    pub fn new(observed_date: Option<NaiveDate>) -> Self {
        Self {
            observed_date,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, entry: RankedProduct) {
        self.entries.insert(entry.product_id.clone(), entry);
    }

    pub fn mark_unranked(&mut self, product_id: impl Into<String>) {
        self.unranked.push(product_id.into());
    }

    pub fn get(&self, product_id: &str) -> Option<&RankedProduct> {
        self.entries.get(product_id)
    }

    pub fn rank_of(&self, product_id: &str) -> Option<Rank> {
        self.entries.get(product_id).map(|e| e.rank)
    }

    pub fn unranked(&self) -> &[String] {
        &self.unranked
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending product id order
    pub fn iter(&self) -> impl Iterator<Item = &RankedProduct> {
        self.entries.values()
    }

    /// Plain product id → rank mapping, the shape persisted as history
    pub fn ranks(&self) -> RankHistory {
        self.entries
            .values()
            .map(|e| (e.product_id.clone(), e.rank))
            .collect()
    }
}

/// Previously stored rank per product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankHistory(BTreeMap<String, Rank>);

impl RankHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, product_id: &str) -> Option<Rank> {
        self.0.get(product_id).copied()
    }

    pub fn insert(&mut self, product_id: impl Into<String>, rank: Rank) -> Option<Rank> {
        self.0.insert(product_id.into(), rank)
    }

    /// Upsert every entry of `other`; entries absent from `other` are kept
    pub fn upsert_all(&mut self, other: &RankHistory) {
        for (product_id, rank) in other.iter() {
            self.0.insert(product_id.to_string(), rank);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rank)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, Rank)> for RankHistory {
    fn from_iter<I: IntoIterator<Item = (String, Rank)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Our rank for a product moved since the previous run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankChangeEvent {
    pub product_id: String,
    pub product_name: String,
    pub previous_rank: Rank,
    pub current_rank: Rank,
}

impl RankChangeEvent {
    /// Positive when we moved up (towards rank 1)
    pub fn delta(&self) -> i64 {
        i64::from(self.previous_rank) - i64::from(self.current_rank)
    }

    pub fn improved(&self) -> bool {
        self.current_rank < self.previous_rank
    }
}
