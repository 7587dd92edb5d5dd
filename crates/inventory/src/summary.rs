//! Dashboard totals over one snapshot.

use chrono::NaiveDate;
use serde::Serialize;

use crate::item::InventoryItem;

/// Aggregate figures shown above the stock table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventorySummary {
    pub item_count: usize,
    pub total_units: u64,
    pub total_value: f64,
    pub low_stock: usize,
    pub near_expiry: usize,
    pub expired: usize,
    pub controlled: usize,
}

impl InventorySummary {
    pub fn from_items(items: &[InventoryItem], today: NaiveDate) -> Self {
        items.iter().fold(Self::default(), |mut acc, item| {
            acc.item_count += 1;
            acc.total_units += u64::from(item.quantity());
            acc.total_value += item.total_cost();
            acc.low_stock += usize::from(item.is_low_stock());
            acc.near_expiry += usize::from(item.is_near_expiry(today));
            acc.expired += usize::from(item.is_expired(today));
            acc.controlled += usize::from(item.is_controlled());
            acc
        })
    }
}
