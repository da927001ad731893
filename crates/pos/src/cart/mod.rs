//! The cart engine: ordered lines, merge-by-identity, clamped quantities.
//!
//! A line's identity is the pair (item identifier, selection restricted to
//! the item's declared axes). Two adds with the same identity merge into one
//! line; quantities are always clamped into `[1, stock]` against the catalog
//! snapshot, including when stock is refreshed downward under a line already
//! in the cart.

mod selection;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use tindahan_core::{CurrencyCode, LineId, Price, ProductId};

use crate::catalog::{CatalogCache, Item};

pub use selection::VariantSelector;

/// A chosen label per axis name. `BTreeMap` keeps identity comparison and
/// serialization order deterministic.
pub type VariantSelection = BTreeMap<String, String>;

/// Errors a cart operation can signal. All are recoverable at the register:
/// nothing is created or mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The item declares an axis the selection does not cover.
    #[error("select a {axis} for {item} first")]
    IncompleteSelection { item: String, axis: String },

    /// The item has no stock, so no line can be created.
    #[error("{item} is out of stock")]
    OutOfStock { item: String },

    /// The item is not in the catalog snapshot.
    #[error("no catalog item {0}")]
    UnknownItem(ProductId),
}

/// One (item, fully-specified variant selection) pairing with a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub selection: VariantSelection,
    pub quantity: u32,
}

impl CartLine {
    /// Whether this line has the given identity.
    #[must_use]
    pub fn has_identity(&self, product_id: ProductId, selection: &VariantSelection) -> bool {
        self.product_id == product_id && self.selection == *selection
    }
}

/// Result of a quantity adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The line now holds this many units (clamped into `[1, stock]`).
    Clamped(u32),
    /// The adjustment took the line to zero or below; it was removed.
    Removed,
    /// No line with that ID exists.
    UnknownLine,
}

/// Ordered list of cart lines with no duplicate identities.
#[derive(Debug, Clone, Default)]
pub struct CartEngine {
    lines: Vec<CartLine>,
    next_line_id: LineId,
}

impl CartEngine {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `requested` units of `item` under `selection`.
    ///
    /// Merges into an existing line with the same identity, capping the
    /// merged quantity at the item's stock (silently - the stock display is
    /// the UI's signal that no more can be added). A new line is created with
    /// `min(requested, stock)` units. A zero request behaves as one unit.
    ///
    /// # Errors
    ///
    /// `IncompleteSelection` if a declared axis has no label in `selection`;
    /// `OutOfStock` if no line exists yet and the item's stock is zero.
    pub fn add_line(
        &mut self,
        item: &Item,
        selection: &VariantSelection,
        requested: u32,
    ) -> Result<LineId, CartError> {
        let identity = restrict_selection(item, selection)?;
        let requested = requested.max(1);

        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.has_identity(item.id, &identity))
        {
            line.quantity = line.quantity.saturating_add(requested).min(item.stock);
            return Ok(line.id);
        }

        let quantity = requested.min(item.stock);
        if quantity == 0 {
            return Err(CartError::OutOfStock {
                item: item.name.clone(),
            });
        }

        let id = self.next_line_id;
        self.next_line_id = self.next_line_id.next();
        self.lines.push(CartLine {
            id,
            product_id: item.id,
            name: item.name.clone(),
            price: item.price,
            selection: identity,
            quantity,
        });
        Ok(id)
    }

    /// Adjust a line's quantity by `delta`.
    ///
    /// The raw result `current + delta` is computed first: at or below zero
    /// the line is removed outright; otherwise it is clamped into
    /// `[1, stock]` against the catalog snapshot. An item whose stock has
    /// dropped to zero under the line is removed by the same floor rule.
    pub fn update_quantity(
        &mut self,
        line_id: LineId,
        delta: i64,
        catalog: &CatalogCache,
    ) -> QuantityChange {
        let Some(index) = self.lines.iter().position(|line| line.id == line_id) else {
            return QuantityChange::UnknownLine;
        };
        let line = &mut self.lines[index];

        let raw = i64::from(line.quantity).saturating_add(delta);
        // Stock of an item that vanished from the snapshot is frozen at the
        // line's current quantity rather than guessed.
        let stock = catalog
            .get(line.product_id)
            .map_or(line.quantity, |item| item.stock);

        let clamped = clamp_quantity(raw, stock);
        if clamped == 0 {
            self.lines.remove(index);
            return QuantityChange::Removed;
        }
        line.quantity = clamped;
        QuantityChange::Clamped(clamped)
    }

    /// Delete a line. Removing an absent line is a no-op, not an error.
    pub fn remove_line(&mut self, line_id: LineId) {
        self.lines.retain(|line| line.id != line_id);
    }

    /// Re-clamp every line against freshly observed stock.
    ///
    /// Called after a catalog refresh. Lines whose item's stock dropped to
    /// zero (or whose item left the catalog) are removed and returned so the
    /// caller can surface them; the rest are capped at the new ceiling.
    pub fn reclamp(&mut self, catalog: &CatalogCache) -> Vec<CartLine> {
        let mut removed = Vec::new();
        self.lines.retain_mut(|line| match catalog.get(line.product_id) {
            Some(item) if item.stock > 0 => {
                line.quantity = line.quantity.min(item.stock);
                true
            }
            _ => {
                removed.push(line.clone());
                false
            }
        });
        removed
    }

    /// Settle a submitted snapshot out of the cart after checkout success.
    ///
    /// Each submitted quantity is subtracted from the line with the same
    /// identity; a line drained to zero is removed. Lines added or grown
    /// while the submission was in flight keep their remainder.
    pub fn settle(&mut self, submitted: &[CartLine]) {
        for sold in submitted {
            if let Some(index) = self
                .lines
                .iter()
                .position(|line| line.has_identity(sold.product_id, &sold.selection))
            {
                let line = &mut self.lines[index];
                line.quantity = line.quantity.saturating_sub(sold.quantity);
                if line.quantity == 0 {
                    self.lines.remove(index);
                }
            }
        }
    }

    /// Sum of `price × quantity` over all lines, recomputed on every call
    /// with no intermediate rounding.
    #[must_use]
    pub fn total(&self) -> Price {
        let amount: Decimal = self
            .lines
            .iter()
            .map(|line| line.price.line_total(line.quantity))
            .sum();
        let currency_code = self
            .lines
            .first()
            .map_or(CurrencyCode::default(), |line| line.price.currency_code);
        Price::new(amount, currency_code)
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up a line by ID.
    #[must_use]
    pub fn get(&self, line_id: LineId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.id == line_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

/// Build the line identity: the selection restricted to the item's declared
/// axes. Extra keys are ignored; a missing or empty label fails.
fn restrict_selection(
    item: &Item,
    selection: &VariantSelection,
) -> Result<VariantSelection, CartError> {
    let mut identity = VariantSelection::new();
    for axis in &item.axes {
        match selection.get(&axis.name).filter(|label| !label.is_empty()) {
            Some(label) => {
                identity.insert(axis.name.clone(), label.clone());
            }
            None => {
                return Err(CartError::IncompleteSelection {
                    item: item.name.clone(),
                    axis: axis.name.clone(),
                });
            }
        }
    }
    Ok(identity)
}

/// Clamp a raw quantity into `[1, stock]`, falling through to zero (removal)
/// when the raw value is non-positive or the ceiling itself is zero.
const fn clamp_quantity(raw: i64, stock: u32) -> u32 {
    if raw <= 0 || stock == 0 {
        return 0;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let raw = if raw > stock as i64 {
        stock
    } else {
        raw as u32
    };
    raw
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::VariantAxis;
    use rust_decimal::dec;

    fn catalog() -> CatalogCache {
        let mut cache = CatalogCache::new();
        cache.replace(vec![
            Item {
                id: ProductId::new(1),
                name: "Candle".to_string(),
                price: Price::php(dec!(10)),
                stock: 3,
                axes: Vec::new(),
                hidden: false,
            },
            Item {
                id: ProductId::new(2),
                name: "Bible".to_string(),
                price: Price::php(dec!(15)),
                stock: 5,
                axes: vec![VariantAxis {
                    name: "size".to_string(),
                    labels: vec!["S".to_string(), "M".to_string()],
                }],
                hidden: false,
            },
            Item {
                id: ProductId::new(3),
                name: "Rosary".to_string(),
                price: Price::php(dec!(12)),
                stock: 0,
                axes: Vec::new(),
                hidden: false,
            },
        ]);
        cache
    }

    fn selection(pairs: &[(&str, &str)]) -> VariantSelection {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_add_merges_identical_identity() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();

        let first = cart.add_line(item, &VariantSelection::new(), 1).unwrap();
        let second = cart.add_line(item, &VariantSelection::new(), 1).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_add_caps_at_stock_silently() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();

        cart.add_line(item, &VariantSelection::new(), 2).unwrap();
        // Already at 2 of 3; asking for 5 more caps at 3 with no error.
        cart.add_line(item, &VariantSelection::new(), 5).unwrap();
        assert_eq!(cart.lines()[0].quantity, 3);

        // At the cap, another add leaves the line unchanged.
        cart.add_line(item, &VariantSelection::new(), 1).unwrap();
        assert_eq!(cart.lines()[0].quantity, 3);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_add_zero_stock_signals_out_of_stock() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(3)).unwrap();
        let mut cart = CartEngine::new();

        let err = cart.add_line(item, &VariantSelection::new(), 1).unwrap_err();
        assert_eq!(
            err,
            CartError::OutOfStock {
                item: "Rosary".to_string()
            }
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_incomplete_selection_creates_nothing() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(2)).unwrap();
        let mut cart = CartEngine::new();

        let err = cart.add_line(item, &VariantSelection::new(), 1).unwrap_err();
        assert!(matches!(err, CartError::IncompleteSelection { ref axis, .. } if axis == "size"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_distinct_selections_make_distinct_lines() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(2)).unwrap();
        let mut cart = CartEngine::new();

        cart.add_line(item, &selection(&[("size", "S")]), 1).unwrap();
        cart.add_line(item, &selection(&[("size", "M")]), 1).unwrap();

        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_identity_ignores_undeclared_axes() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(2)).unwrap();
        let mut cart = CartEngine::new();

        cart.add_line(item, &selection(&[("size", "S")]), 1).unwrap();
        cart.add_line(item, &selection(&[("size", "S"), ("gift", "yes")]), 1)
            .unwrap();

        // "gift" is not a declared axis, so both adds share one identity.
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_update_quantity_clamps_to_stock() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        let line = cart.add_line(item, &VariantSelection::new(), 2).unwrap();

        assert_eq!(
            cart.update_quantity(line, 5, &catalog),
            QuantityChange::Clamped(3)
        );
    }

    #[test]
    fn test_update_quantity_floors_at_one() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        let line = cart.add_line(item, &VariantSelection::new(), 2).unwrap();

        assert_eq!(
            cart.update_quantity(line, -1, &catalog),
            QuantityChange::Clamped(1)
        );
    }

    #[test]
    fn test_update_quantity_to_zero_removes_line() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        let line = cart.add_line(item, &VariantSelection::new(), 3).unwrap();

        assert_eq!(
            cart.update_quantity(line, -3, &catalog),
            QuantityChange::Removed
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_unknown_line() {
        let catalog = catalog();
        let mut cart = CartEngine::new();
        assert_eq!(
            cart.update_quantity(LineId::new(42), 1, &catalog),
            QuantityChange::UnknownLine
        );
    }

    #[test]
    fn test_remove_line_is_idempotent() {
        let catalog = catalog();
        let item = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        let line = cart.add_line(item, &VariantSelection::new(), 1).unwrap();

        cart.remove_line(line);
        cart.remove_line(line);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_total_recomputes_exactly() {
        let catalog = catalog();
        let candle = catalog.get(ProductId::new(1)).unwrap();
        let bible = catalog.get(ProductId::new(2)).unwrap();
        let mut cart = CartEngine::new();

        cart.add_line(candle, &VariantSelection::new(), 2).unwrap();
        let before = cart.total();

        let line = cart.add_line(bible, &selection(&[("size", "M")]), 3).unwrap();
        assert_eq!(cart.total().amount, dec!(65)); // 2×10 + 3×15

        cart.remove_line(line);
        assert_eq!(cart.total(), before);
    }

    #[test]
    fn test_total_of_empty_cart_is_zero() {
        assert_eq!(CartEngine::new().total().amount, Decimal::ZERO);
    }

    #[test]
    fn test_reclamp_caps_and_removes() {
        let mut catalog = catalog();
        let candle = catalog.get(ProductId::new(1)).unwrap().clone();
        let bible = catalog.get(ProductId::new(2)).unwrap().clone();
        let mut cart = CartEngine::new();
        cart.add_line(&candle, &VariantSelection::new(), 3).unwrap();
        cart.add_line(&bible, &selection(&[("size", "S")]), 4).unwrap();

        // Fresh stock: candle dropped to 2, bible sold out.
        catalog.replace(vec![
            Item { stock: 2, ..candle },
            Item { stock: 0, ..bible },
        ]);
        let removed = cart.reclamp(&catalog);

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].product_id, ProductId::new(2));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 2);
    }

    #[test]
    fn test_reclamp_removes_lines_for_vanished_items() {
        let mut catalog = catalog();
        let candle = catalog.get(ProductId::new(1)).unwrap().clone();
        let mut cart = CartEngine::new();
        cart.add_line(&candle, &VariantSelection::new(), 1).unwrap();

        catalog.replace(Vec::new());
        let removed = cart.reclamp(&catalog);

        assert_eq!(removed.len(), 1);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_settle_drains_submitted_quantities() {
        let catalog = catalog();
        let candle = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        cart.add_line(candle, &VariantSelection::new(), 2).unwrap();

        let snapshot = cart.lines().to_vec();
        // The operator adds one more unit while the submission is in flight.
        cart.add_line(candle, &VariantSelection::new(), 1).unwrap();

        cart.settle(&snapshot);
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].quantity, 1);

        // Settling the snapshot again drains the remainder.
        cart.settle(&snapshot);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_bounds_hold_after_every_operation() {
        let catalog = catalog();
        let candle = catalog.get(ProductId::new(1)).unwrap();
        let mut cart = CartEngine::new();
        let line = cart.add_line(candle, &VariantSelection::new(), 100).unwrap();

        let assert_bounds = |cart: &CartEngine| {
            for line in cart.lines() {
                let stock = catalog.get(line.product_id).unwrap().stock;
                assert!(line.quantity >= 1 && line.quantity <= stock);
            }
        };

        assert_bounds(&cart);
        cart.update_quantity(line, 50, &catalog);
        assert_bounds(&cart);
        cart.update_quantity(line, -1, &catalog);
        assert_bounds(&cart);
    }
}
