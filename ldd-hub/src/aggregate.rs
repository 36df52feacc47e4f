//! Aggregation Engine
//!
//! Current totals per node and category, recomputed from the store on
//! every request.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::{NodeTotals, ReadingStore};
use crate::error::HubResult;
use crate::model::SizeCategory;

/// Response of the totals view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsView {
    pub totals: NodeTotals,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Give every node an entry for every category, zero where nothing was counted
pub fn fill_categories(mut totals: NodeTotals) -> NodeTotals {
    for per_node in totals.values_mut() {
        for category in SizeCategory::ALL {
            per_node.entry(category).or_insert(0);
        }
    }
    totals
}

/// Read the store's current aggregate
pub async fn compute_totals(store: &dyn ReadingStore) -> HubResult<TotalsView> {
    let totals = fill_categories(store.grouped_totals().await?);
    let last_updated = store.last_update().await?;
    Ok(TotalsView {
        totals,
        last_updated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_fill_categories_adds_zeros() {
        let mut totals = NodeTotals::new();
        totals
            .entry("N1".to_string())
            .or_insert_with(BTreeMap::new)
            .insert(SizeCategory::Under30, 7);

        let filled = fill_categories(totals);
        let n1 = &filled["N1"];
        assert_eq!(n1.len(), SizeCategory::ALL.len());
        assert_eq!(n1[&SizeCategory::Under30], 7);
        assert_eq!(n1[&SizeCategory::Over150], 0);
    }

    #[test]
    fn test_fill_categories_keeps_empty_empty() {
        assert!(fill_categories(NodeTotals::new()).is_empty());
    }

    #[test]
    fn test_totals_serialize_with_category_labels() {
        let mut totals = NodeTotals::new();
        totals
            .entry("N1".to_string())
            .or_default()
            .insert(SizeCategory::From30To50, 4);
        let view = TotalsView {
            totals,
            last_updated: None,
        };

        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["totals"]["N1"]["30-50mm"], 4);
        assert!(value["last_updated"].is_null());
    }
}
