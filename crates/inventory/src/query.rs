use chrono::NaiveDate;
use serde::Serialize;

use crate::item::{Category, InventoryItem};

/// Filter for listing the inventory. The default matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryQuery {
    /// `None` means "All".
    pub category: Option<Category>,
    /// Case-insensitive substring of the item name.
    pub search: Option<String>,
}

impl InventoryQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        self.search = Some(needle.into());
        self
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if self.category.is_some_and(|c| c != item.category()) {
            return false;
        }

        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => item
                .name()
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        }
    }
}

/// Home-screen counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySummary {
    /// Distinct entries.
    pub total_items: usize,
    /// Sum of quantities, saturating.
    pub total_quantity: u64,
    /// Entries with `quantity <= low_stock_threshold`.
    pub low_stock: usize,
    /// Entries whose expiry date is before `today`.
    pub expired: usize,
    /// Entries expiring between `today` and `today + expiring_within_days`, inclusive.
    pub expiring_soon: usize,
}

pub(crate) fn summarize(
    items: &[InventoryItem],
    today: NaiveDate,
    low_stock_threshold: u32,
    expiring_within_days: u32,
) -> InventorySummary {
    let horizon = today
        .checked_add_days(chrono::Days::new(u64::from(expiring_within_days)))
        .unwrap_or(NaiveDate::MAX);

    items.iter().fold(InventorySummary::default(), |mut acc, item| {
        acc.total_items += 1;
        acc.total_quantity = acc
            .total_quantity
            .saturating_add(u64::from(item.quantity().get()));
        if item.quantity().get() <= low_stock_threshold {
            acc.low_stock += 1;
        }
        match item.expiry_date() {
            Some(date) if date < today => acc.expired += 1,
            Some(date) if date <= horizon => acc.expiring_soon += 1,
            _ => {}
        }
        acc
    })
}
