//! Checkout coordination: snapshot, submit, reconcile.
//!
//! The coordinator is a plain state machine
//! (`Idle → Submitting → {Success, Failure} → Idle` on acknowledge) with no
//! I/O of its own. [`submit_checkout`] drives it against a
//! [`CheckoutService`](crate::shop_api::CheckoutService): it captures an
//! immutable snapshot of the cart under the session lock, releases the lock
//! for the duration of the service call so the register stays usable, and
//! re-acquires it to reconcile the outcome. Exactly one service call is made
//! per submission; retries are user-initiated re-submissions.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use tindahan_core::ProductId;

use crate::cart::{CartEngine, CartLine};
use crate::session::PosSession;
use crate::shop_api::CheckoutService;

/// A stock decrement actually applied by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockDelta {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// What the checkout service recorded for a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    /// Per-item quantities the backend applied. Empty means the backend did
    /// not echo them back and the submitted quantities are assumed applied.
    #[serde(default)]
    pub applied: Vec<StockDelta>,
    /// Backend reference for the recorded sale, if any.
    #[serde(default)]
    pub reference: Option<String>,
    /// When the sale was recorded.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
}

/// An immutable copy of the cart taken at submit time.
///
/// Later cart edits do not alter what was submitted or what gets settled out
/// of the cart on success.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Fresh per submission; lets a backend that adds reconciliation dedupe.
    pub idempotency_key: Uuid,
    pub lines: Vec<CartLine>,
}

/// Where the coordinator currently is.
#[derive(Debug, Clone, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Submitting,
    Success(CheckoutReceipt),
    Failure(String),
}

/// Why a submission could not begin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    /// A submission is already in flight; repeated operator taps must not
    /// produce duplicate checkouts.
    #[error("a checkout is already in flight")]
    SubmissionInFlight,

    /// Submitting an empty cart is a no-op with no service call.
    #[error("the cart is empty")]
    EmptyCart,
}

/// Serializes cart submissions and tracks their lifecycle.
#[derive(Debug, Default)]
pub struct CheckoutCoordinator {
    phase: CheckoutPhase,
    in_flight: Option<CheckoutRequest>,
}

impl CheckoutCoordinator {
    /// Create a coordinator in `Idle`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> &CheckoutPhase {
        &self.phase
    }

    /// Whether a submission is in flight.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        matches!(self.phase, CheckoutPhase::Submitting)
    }

    /// Snapshot the cart and move to `Submitting`.
    ///
    /// Beginning from `Success` or `Failure` implicitly acknowledges the
    /// previous result.
    ///
    /// # Errors
    ///
    /// `SubmissionInFlight` while already `Submitting`; `EmptyCart` when
    /// there is nothing to submit (the phase is left untouched).
    pub fn begin(&mut self, cart: &CartEngine) -> Result<CheckoutRequest, CheckoutError> {
        if self.is_submitting() {
            return Err(CheckoutError::SubmissionInFlight);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let request = CheckoutRequest {
            idempotency_key: Uuid::new_v4(),
            lines: cart.lines().to_vec(),
        };
        self.phase = CheckoutPhase::Submitting;
        self.in_flight = Some(request.clone());
        Ok(request)
    }

    /// Record a successful outcome and hand back the snapshot taken at
    /// [`begin`](Self::begin) for reconciliation.
    pub fn complete_success(&mut self, receipt: CheckoutReceipt) -> Option<CheckoutRequest> {
        let snapshot = self.in_flight.take();
        self.phase = CheckoutPhase::Success(receipt);
        snapshot
    }

    /// Record a failed outcome. The snapshot is discarded; cart and catalog
    /// are left exactly as submitted.
    pub fn complete_failure(&mut self, reason: impl Into<String>) {
        self.in_flight = None;
        self.phase = CheckoutPhase::Failure(reason.into());
    }

    /// Dismiss a `Success` or `Failure` notice, returning to `Idle`.
    /// Returns false if there was nothing to dismiss.
    pub fn acknowledge(&mut self) -> bool {
        match self.phase {
            CheckoutPhase::Success(_) | CheckoutPhase::Failure(_) => {
                self.phase = CheckoutPhase::Idle;
                true
            }
            CheckoutPhase::Idle | CheckoutPhase::Submitting => false,
        }
    }
}

/// Outcome of one [`submit_checkout`] call, for the caller to surface.
#[derive(Debug, Clone)]
pub enum SubmitOutcome {
    /// The backend recorded the sale; cart settled, stock decremented.
    Completed(CheckoutReceipt),
    /// The backend rejected the submission or the call failed; cart and
    /// catalog are untouched and the operator may retry.
    Failed(String),
    /// Nothing to submit; no service call was made.
    EmptyCart,
    /// A previous submission is still in flight.
    AlreadySubmitting,
}

/// Submit the current cart to the checkout service.
///
/// The session lock is held only to snapshot and to reconcile; cart edits
/// made while the call is in flight land on the live cart and survive
/// settling. The call is bounded by `call_timeout` and resolves to `Failure`
/// rather than leaving the coordinator `Submitting` indefinitely.
pub async fn submit_checkout<S>(
    session: &Mutex<PosSession>,
    service: &S,
    call_timeout: Duration,
) -> SubmitOutcome
where
    S: CheckoutService + ?Sized,
{
    let request = {
        let mut session = session.lock().await;
        match session.begin_checkout() {
            Ok(request) => request,
            Err(CheckoutError::EmptyCart) => return SubmitOutcome::EmptyCart,
            Err(CheckoutError::SubmissionInFlight) => return SubmitOutcome::AlreadySubmitting,
        }
    };

    info!(
        key = %request.idempotency_key,
        lines = request.lines.len(),
        "Submitting checkout"
    );

    let outcome = tokio::time::timeout(call_timeout, service.checkout(&request)).await;

    let mut session = session.lock().await;
    match outcome {
        Ok(Ok(receipt)) => {
            session.finish_checkout_success(receipt.clone());
            info!(key = %request.idempotency_key, "Checkout recorded");
            SubmitOutcome::Completed(receipt)
        }
        Ok(Err(err)) => {
            let reason = err.to_string();
            warn!(key = %request.idempotency_key, error = %reason, "Checkout failed");
            session.finish_checkout_failure(reason.clone());
            SubmitOutcome::Failed(reason)
        }
        Err(_elapsed) => {
            let reason = format!("checkout timed out after {}s", call_timeout.as_secs());
            warn!(key = %request.idempotency_key, "Checkout timed out");
            session.finish_checkout_failure(reason.clone());
            SubmitOutcome::Failed(reason)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogCache, Item};
    use crate::cart::VariantSelection;
    use rust_decimal::dec;
    use tindahan_core::Price;

    fn cart_with_one_line() -> CartEngine {
        let mut catalog = CatalogCache::new();
        catalog.replace(vec![Item {
            id: ProductId::new(1),
            name: "Candle".to_string(),
            price: Price::php(dec!(10)),
            stock: 3,
            axes: Vec::new(),
            hidden: false,
        }]);
        let mut cart = CartEngine::new();
        cart.add_line(
            catalog.get(ProductId::new(1)).unwrap(),
            &VariantSelection::new(),
            2,
        )
        .unwrap();
        cart
    }

    #[test]
    fn test_begin_on_empty_cart_is_a_no_op() {
        let mut coordinator = CheckoutCoordinator::new();
        let err = coordinator.begin(&CartEngine::new()).unwrap_err();
        assert_eq!(err, CheckoutError::EmptyCart);
        assert!(matches!(coordinator.phase(), CheckoutPhase::Idle));
    }

    #[test]
    fn test_begin_snapshots_the_cart() {
        let mut coordinator = CheckoutCoordinator::new();
        let cart = cart_with_one_line();
        let request = coordinator.begin(&cart).unwrap();

        assert!(coordinator.is_submitting());
        assert_eq!(request.lines.len(), 1);
        assert_eq!(request.lines[0].quantity, 2);
    }

    #[test]
    fn test_second_begin_while_submitting_is_rejected() {
        let mut coordinator = CheckoutCoordinator::new();
        let cart = cart_with_one_line();
        coordinator.begin(&cart).unwrap();

        let err = coordinator.begin(&cart).unwrap_err();
        assert_eq!(err, CheckoutError::SubmissionInFlight);
    }

    #[test]
    fn test_success_hands_back_the_snapshot() {
        let mut coordinator = CheckoutCoordinator::new();
        let cart = cart_with_one_line();
        let request = coordinator.begin(&cart).unwrap();

        let snapshot = coordinator
            .complete_success(CheckoutReceipt {
                applied: Vec::new(),
                reference: None,
                recorded_at: None,
            })
            .unwrap();
        assert_eq!(snapshot.idempotency_key, request.idempotency_key);
        assert!(matches!(coordinator.phase(), CheckoutPhase::Success(_)));
    }

    #[test]
    fn test_failure_then_acknowledge_returns_to_idle() {
        let mut coordinator = CheckoutCoordinator::new();
        let cart = cart_with_one_line();
        coordinator.begin(&cart).unwrap();
        coordinator.complete_failure("backend said no");

        assert!(matches!(coordinator.phase(), CheckoutPhase::Failure(_)));
        assert!(coordinator.acknowledge());
        assert!(matches!(coordinator.phase(), CheckoutPhase::Idle));
        assert!(!coordinator.acknowledge());
    }

    #[test]
    fn test_fresh_idempotency_key_per_submission() {
        let mut coordinator = CheckoutCoordinator::new();
        let cart = cart_with_one_line();

        let first = coordinator.begin(&cart).unwrap();
        coordinator.complete_failure("transient");
        let second = coordinator.begin(&cart).unwrap();

        assert_ne!(first.idempotency_key, second.idempotency_key);
    }
}
