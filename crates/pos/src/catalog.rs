//! Sellable items and the in-memory catalog snapshot.
//!
//! The cache holds the last successfully fetched item set. It is a pure data
//! holder: refreshes replace the snapshot wholesale, views are derived on
//! demand, and the only mutations are the visibility flag and the stock
//! decrements applied after a successful checkout. A failed fetch never
//! reaches [`CatalogCache::replace`], so the previous snapshot survives it.

use serde::{Deserialize, Serialize};

use tindahan_core::{Price, ProductId, StockStatus};

/// A named dimension of choice on an item (e.g., "size" → S/M/L).
///
/// Label order is the display order and is preserved from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantAxis {
    pub name: String,
    pub labels: Vec<String>,
}

/// A sellable catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub stock: u32,
    /// Variant axes the register must resolve before this item can be carted.
    pub axes: Vec<VariantAxis>,
    /// Hidden items are excluded from the sellable view but kept for
    /// historical reporting.
    pub hidden: bool,
}

impl Item {
    /// Look up a declared axis by name.
    #[must_use]
    pub fn axis(&self, name: &str) -> Option<&VariantAxis> {
        self.axes.iter().find(|axis| axis.name == name)
    }

    /// Stock badge derived from the current count.
    #[must_use]
    pub const fn stock_status(&self) -> StockStatus {
        StockStatus::from_stock(self.stock)
    }
}

/// Last-fetched set of sellable items, in catalog order.
#[derive(Debug, Clone, Default)]
pub struct CatalogCache {
    items: Vec<Item>,
}

impl CatalogCache {
    /// Create an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Replace the snapshot with a freshly fetched item set.
    pub fn replace(&mut self, items: Vec<Item>) {
        self.items = items;
    }

    /// Look up an item by identifier.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    /// All items in catalog order, hidden included.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Sellable items, recomputed on every call.
    #[must_use]
    pub fn visible_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|item| !item.hidden).collect()
    }

    /// Hidden items, recomputed on every call.
    #[must_use]
    pub fn hidden_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|item| item.hidden).collect()
    }

    /// Flip an item's visibility flag locally. Returns false if the item is
    /// not in the snapshot.
    pub fn set_hidden(&mut self, id: ProductId, hidden: bool) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.hidden = hidden;
                true
            }
            None => false,
        }
    }

    /// Decrement an item's stock after a checkout, saturating at zero.
    pub fn decrement_stock(&mut self, id: ProductId, quantity: u32) {
        if let Some(item) = self.items.iter_mut().find(|item| item.id == id) {
            item.stock = item.stock.saturating_sub(quantity);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
