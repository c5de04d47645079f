use crate::models::{RankChangeEvent, RankHistory, RankSnapshot};

/// Compare the current snapshot with the stored ranks.
///
/// Only products present in both are evaluated. First-seen products and
/// products missing from today's snapshot produce no event. Events come out
/// in ascending product id order.
pub fn detect_changes(current: &RankSnapshot, previous: &RankHistory) -> Vec<RankChangeEvent> {
    current
        .iter()
        .filter_map(|entry| {
            let previous_rank = previous.get(&entry.product_id)?;
            (previous_rank != entry.rank).then(|| RankChangeEvent {
                product_id: entry.product_id.clone(),
                product_name: entry.product_name.clone(),
                previous_rank,
                current_rank: entry.rank,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Rank, RankedProduct};
    use rust_decimal::Decimal;

    fn snapshot(ranks: &[(&str, Rank)]) -> RankSnapshot {
        let mut snapshot = RankSnapshot::new(None);
        for (product_id, rank) in ranks {
            snapshot.insert(RankedProduct {
                product_id: product_id.to_string(),
                product_name: format!("Product {}", product_id),
                rank: *rank,
                our_price: Decimal::ONE,
                seller_count: 4,
            });
        }
        snapshot
    }

    fn history(ranks: &[(&str, Rank)]) -> RankHistory {
        ranks.iter().map(|(id, rank)| (id.to_string(), *rank)).collect()
    }

    #[test]
    fn test_unchanged_rank_emits_nothing() {
        let events = detect_changes(&snapshot(&[("P1", 2)]), &history(&[("P1", 2)]));
        assert!(events.is_empty());
    }

    #[test]
    fn test_changed_rank_emits_event() {
        let events = detect_changes(&snapshot(&[("P1", 1)]), &history(&[("P1", 2)]));
        assert_eq!(
            events,
            vec![RankChangeEvent {
                product_id: "P1".to_string(),
                product_name: "Product P1".to_string(),
                previous_rank: 2,
                current_rank: 1,
            }]
        );
    }

    #[test]
    fn test_new_and_missing_products_are_silent() {
        let current = snapshot(&[("P3", 3)]);
        let previous = history(&[("P9", 1)]);
        assert!(detect_changes(&current, &previous).is_empty());
    }

    #[test]
    fn test_events_are_ordered_by_product() {
        let current = snapshot(&[("P2", 1), ("P10", 4), ("P1", 3)]);
        let previous = history(&[("P1", 1), ("P2", 2), ("P10", 2)]);

        let ids: Vec<String> = detect_changes(&current, &previous)
            .into_iter()
            .map(|e| e.product_id)
            .collect();

        assert_eq!(ids, vec!["P1", "P10", "P2"]);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let current = snapshot(&[("P1", 1), ("P2", 5)]);
        let previous = current.ranks();

        assert!(detect_changes(&current, &previous).is_empty());
        assert!(detect_changes(&current, &previous).is_empty());
    }
}
