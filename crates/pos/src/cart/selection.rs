//! In-progress variant choices, tracked per item.

use std::collections::HashMap;

use tindahan_core::ProductId;

use super::VariantSelection;
use crate::catalog::Item;

/// Per-item record of the register operator's axis choices.
///
/// A pure key-value store scoped by item: it does not validate labels against
/// the item's declared values (the UI only offers valid options), and
/// selecting for one item never affects another's.
#[derive(Debug, Clone, Default)]
pub struct VariantSelector {
    selections: HashMap<ProductId, VariantSelection>,
}

impl VariantSelector {
    /// Create an empty selector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the chosen label for `axis` on `item`.
    pub fn select(&mut self, item: ProductId, axis: impl Into<String>, label: impl Into<String>) {
        self.selections
            .entry(item)
            .or_default()
            .insert(axis.into(), label.into());
    }

    /// The current selection for `item`; empty if nothing has been chosen.
    #[must_use]
    pub fn selection(&self, item: ProductId) -> VariantSelection {
        self.selections.get(&item).cloned().unwrap_or_default()
    }

    /// True iff every axis declared by `item` has a recorded label.
    #[must_use]
    pub fn is_complete(&self, item: &Item) -> bool {
        let selection = self.selections.get(&item.id);
        item.axes.iter().all(|axis| {
            selection
                .and_then(|s| s.get(&axis.name))
                .is_some_and(|label| !label.is_empty())
        })
    }

    /// Drop all recorded choices for `item`.
    pub fn clear(&mut self, item: ProductId) {
        self.selections.remove(&item);
    }
}
