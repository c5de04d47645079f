use crate::models::{PriceObservation, Rank, RankSnapshot, RankedProduct};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::debug;

/// Ranks our company's price against every other seller per product
///
/// Observations are grouped by product id, invalid prices are dropped, and
/// the rest are stably sorted by ascending price. Our rank is the 1-based
/// position of our first observation in that order, so sellers at the same
/// price are ordered by their position in the input (positional ties).
pub struct RankCalculator {
    our_company: String,
}

impl RankCalculator {
    pub fn new(our_company: impl Into<String>) -> Self {
        Self {
            our_company: our_company.into(),
        }
    }

    pub fn our_company(&self) -> &str {
        &self.our_company
    }

    /// Seller names are compared exactly, as stored
    fn is_ours(&self, observation: &PriceObservation) -> bool {
        observation.seller == self.our_company
    }

    /// Compute the snapshot for a set of observations from one date.
    ///
    /// Products without any valid price are skipped. Products whose valid
    /// prices do not include ours get no entry and are listed as unranked.
    pub fn compute(&self, observations: &[PriceObservation]) -> RankSnapshot {
        let observed_date = observations.iter().map(|o| o.observed_date).max();
        let mut snapshot = RankSnapshot::new(observed_date);

        let mut by_product: BTreeMap<&str, Vec<&PriceObservation>> = BTreeMap::new();
        for observation in observations {
            by_product
                .entry(observation.product_id.as_str())
                .or_default()
                .push(observation);
        }

        for (product_id, group) in by_product {
            let mut priced: Vec<(&PriceObservation, Decimal)> = group
                .into_iter()
                .filter_map(|o| o.price.amount().map(|amount| (o, amount)))
                .collect();

            if priced.is_empty() {
                debug!("Product {} has no valid prices, skipping", product_id);
                continue;
            }

            // Vec::sort_by is stable
            priced.sort_by(|a, b| a.1.cmp(&b.1));

            match priced.iter().position(|(o, _)| self.is_ours(o)) {
                Some(index) => {
                    let (ours, our_price) = priced[index];
                    snapshot.insert(RankedProduct {
                        product_id: product_id.to_string(),
                        product_name: ours.product_name.clone(),
                        rank: Rank::try_from(index + 1).unwrap_or(Rank::MAX),
                        our_price,
                        seller_count: priced.len(),
                    });
                }
                None => {
                    debug!("Product {} has no valid price from {}", product_id, self.our_company);
                    snapshot.mark_unranked(product_id);
                }
            }
        }

        snapshot
    }
}
