//! The register session: one owned state object for one shopping session.
//!
//! All cart, selection, and catalog mutation flows through the session's
//! methods - there is no shared global state and no direct field access from
//! the outside. The session lives for the duration of a shopping session;
//! its cart is emptied only by a successful checkout or explicit operator
//! action, never by navigation or a catalog refresh.

use tindahan_core::{LineId, ProductId};

use crate::cart::{CartEngine, CartError, CartLine, QuantityChange, VariantSelector};
use crate::catalog::{CatalogCache, Item};
use crate::checkout::{CheckoutCoordinator, CheckoutError, CheckoutReceipt, CheckoutRequest};

/// Session-scoped state for one register.
#[derive(Debug, Default)]
pub struct PosSession {
    catalog: CatalogCache,
    selector: VariantSelector,
    cart: CartEngine,
    checkout: CheckoutCoordinator,
}

impl PosSession {
    /// Create a fresh session with an empty catalog and cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current catalog snapshot.
    #[must_use]
    pub const fn catalog(&self) -> &CatalogCache {
        &self.catalog
    }

    /// The cart, read-only. Mutation goes through the session methods.
    #[must_use]
    pub const fn cart(&self) -> &CartEngine {
        &self.cart
    }

    /// The checkout coordinator, read-only.
    #[must_use]
    pub const fn checkout(&self) -> &CheckoutCoordinator {
        &self.checkout
    }

    /// Swap in a freshly fetched item set and re-clamp every cart line
    /// against the new stock ceilings.
    ///
    /// Returns the lines that were removed because their item sold out or
    /// left the catalog. Call this only with a successful fetch result; a
    /// failed fetch must leave the previous snapshot untouched by never
    /// reaching this method.
    pub fn refresh_catalog(&mut self, items: Vec<Item>) -> Vec<CartLine> {
        self.catalog.replace(items);
        self.cart.reclamp(&self.catalog)
    }

    /// Record a variant axis choice for an item.
    pub fn select_variant(
        &mut self,
        item: ProductId,
        axis: impl Into<String>,
        label: impl Into<String>,
    ) {
        self.selector.select(item, axis, label);
    }

    /// Add an item to the cart under its currently recorded selection.
    ///
    /// # Errors
    ///
    /// `UnknownItem` if the item is not in the catalog snapshot, plus the
    /// cart engine's `IncompleteSelection` and `OutOfStock` refusals.
    pub fn add_to_cart(&mut self, item: ProductId, quantity: u32) -> Result<LineId, CartError> {
        let item = self
            .catalog
            .get(item)
            .ok_or(CartError::UnknownItem(item))?
            .clone();
        let selection = self.selector.selection(item.id);
        self.cart.add_line(&item, &selection, quantity)
    }

    /// Adjust a cart line's quantity by `delta`.
    pub fn update_quantity(&mut self, line: LineId, delta: i64) -> QuantityChange {
        self.cart.update_quantity(line, delta, &self.catalog)
    }

    /// Remove a cart line; removing an absent line is a no-op.
    pub fn remove_line(&mut self, line: LineId) {
        self.cart.remove_line(line);
    }

    /// Empty the cart by explicit operator action.
    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Flip an item's visibility flag in the local snapshot.
    pub fn set_hidden(&mut self, item: ProductId, hidden: bool) -> bool {
        self.catalog.set_hidden(item, hidden)
    }

    /// Snapshot the cart and move the coordinator to `Submitting`.
    ///
    /// # Errors
    ///
    /// See [`CheckoutCoordinator::begin`].
    pub fn begin_checkout(&mut self) -> Result<CheckoutRequest, CheckoutError> {
        self.checkout.begin(&self.cart)
    }

    /// Reconcile a successful checkout: decrement catalog stock by the
    /// applied deltas and settle the submitted snapshot out of the cart.
    ///
    /// When the backend does not echo the applied deltas, the submitted
    /// quantities are assumed applied.
    pub fn finish_checkout_success(&mut self, receipt: CheckoutReceipt) {
        let Some(snapshot) = self.checkout.complete_success(receipt.clone()) else {
            return;
        };

        if receipt.applied.is_empty() {
            for line in &snapshot.lines {
                self.catalog.decrement_stock(line.product_id, line.quantity);
            }
        } else {
            for delta in &receipt.applied {
                self.catalog.decrement_stock(delta.product_id, delta.quantity);
            }
        }

        self.cart.settle(&snapshot.lines);
    }

    /// Record a failed checkout. Cart and catalog are left exactly as they
    /// were when the submission began.
    pub fn finish_checkout_failure(&mut self, reason: impl Into<String>) {
        self.checkout.complete_failure(reason);
    }

    /// Dismiss a checkout result notice.
    pub fn acknowledge_checkout(&mut self) -> bool {
        self.checkout.acknowledge()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::VariantAxis;
    use crate::checkout::{CheckoutPhase, StockDelta};
    use rust_decimal::dec;
    use tindahan_core::Price;

    fn items() -> Vec<Item> {
        vec![
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
        ]
    }

    fn session() -> PosSession {
        let mut session = PosSession::new();
        session.refresh_catalog(items());
        session
    }

    #[test]
    fn test_add_unknown_item() {
        let mut session = session();
        let err = session.add_to_cart(ProductId::new(99), 1).unwrap_err();
        assert_eq!(err, CartError::UnknownItem(ProductId::new(99)));
    }

    #[test]
    fn test_add_uses_recorded_selection() {
        let mut session = session();
        session.select_variant(ProductId::new(2), "size", "M");
        session.add_to_cart(ProductId::new(2), 1).unwrap();

        let line = &session.cart().lines()[0];
        assert_eq!(line.selection.get("size").unwrap(), "M");
    }

    #[test]
    fn test_selection_survives_add_so_repeat_adds_merge() {
        let mut session = session();
        session.select_variant(ProductId::new(2), "size", "S");
        session.add_to_cart(ProductId::new(2), 1).unwrap();
        session.add_to_cart(ProductId::new(2), 1).unwrap();

        assert_eq!(session.cart().len(), 1);
        assert_eq!(session.cart().lines()[0].quantity, 2);
    }

    #[test]
    fn test_refresh_reclamps_cart() {
        let mut session = session();
        session.add_to_cart(ProductId::new(1), 3).unwrap();

        let mut fresh = items();
        fresh[0].stock = 1;
        let removed = session.refresh_catalog(fresh);

        assert!(removed.is_empty());
        assert_eq!(session.cart().lines()[0].quantity, 1);
    }

    #[test]
    fn test_checkout_success_applies_deltas_and_settles() {
        let mut session = session();
        session.add_to_cart(ProductId::new(1), 2).unwrap();

        session.begin_checkout().unwrap();
        session.finish_checkout_success(CheckoutReceipt {
            applied: vec![StockDelta {
                product_id: ProductId::new(1),
                quantity: 2,
            }],
            reference: Some("sale-17".to_string()),
            recorded_at: None,
        });

        assert!(session.cart().is_empty());
        assert_eq!(session.catalog().get(ProductId::new(1)).unwrap().stock, 1);
        assert!(matches!(
            session.checkout().phase(),
            CheckoutPhase::Success(_)
        ));
    }

    #[test]
    fn test_checkout_success_assumes_deltas_when_not_echoed() {
        let mut session = session();
        session.add_to_cart(ProductId::new(1), 2).unwrap();

        session.begin_checkout().unwrap();
        session.finish_checkout_success(CheckoutReceipt {
            applied: Vec::new(),
            reference: None,
            recorded_at: None,
        });

        assert_eq!(session.catalog().get(ProductId::new(1)).unwrap().stock, 1);
        assert!(session.cart().is_empty());
    }

    #[test]
    fn test_checkout_failure_preserves_cart_and_catalog() {
        let mut session = session();
        session.add_to_cart(ProductId::new(1), 2).unwrap();
        let lines_before = session.cart().lines().to_vec();
        let stock_before = session.catalog().get(ProductId::new(1)).unwrap().stock;

        session.begin_checkout().unwrap();
        session.finish_checkout_failure("connection refused");

        assert_eq!(session.cart().lines(), lines_before.as_slice());
        assert_eq!(
            session.catalog().get(ProductId::new(1)).unwrap().stock,
            stock_before
        );
        assert!(matches!(
            session.checkout().phase(),
            CheckoutPhase::Failure(_)
        ));
    }

    #[test]
    fn test_cart_edits_during_flight_keep_their_remainder() {
        let mut session = session();
        session.add_to_cart(ProductId::new(1), 2).unwrap();
        session.begin_checkout().unwrap();

        // Operator keeps working while the submission is in flight.
        session.add_to_cart(ProductId::new(1), 1).unwrap();

        session.finish_checkout_success(CheckoutReceipt {
            applied: Vec::new(),
            reference: None,
            recorded_at: None,
        });

        // Only the snapshot was settled; the extra unit survives.
        assert_eq!(session.cart().len(), 1);
        assert_eq!(session.cart().lines()[0].quantity, 1);
    }
}
