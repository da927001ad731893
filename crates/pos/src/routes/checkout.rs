//! Checkout route handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::instrument;

use crate::checkout::{CheckoutReceipt, SubmitOutcome, submit_checkout};
use crate::error::Result;
use crate::shop_api::{SaleRecord, history_total};
use crate::state::AppState;

/// Checkout outcome payload.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutView {
    /// Sale recorded; cart settled and stock decremented.
    Success { receipt: CheckoutReceipt },
    /// Submission failed; cart preserved for a retry.
    Failure { reason: String },
    /// Nothing to submit; no service call was made.
    Empty,
    /// A submission is already in flight.
    InFlight,
}

/// Sale history payload with a recomputed running total.
#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub records: Vec<SaleRecordView>,
    pub total: String,
}

/// One recorded sale line.
#[derive(Debug, Serialize)]
pub struct SaleRecordView {
    pub id: i32,
    pub product_name: String,
    pub quantity: u32,
    pub price: String,
    pub subtotal: String,
    pub checked_out_at: String,
}

impl From<&SaleRecord> for SaleRecordView {
    fn from(record: &SaleRecord) -> Self {
        let symbol = record.price.currency_code.symbol();
        Self {
            id: record.id.as_i32(),
            product_name: record.product_name.clone(),
            quantity: record.quantity,
            price: record.price.display(),
            subtotal: format!("{symbol}{:.2}", record.subtotal()),
            checked_out_at: record.checked_out_at.to_rfc3339(),
        }
    }
}

/// Submit the cart to the checkout service.
///
/// Repeated taps while a submission is in flight get 409 instead of a
/// duplicate checkout.
#[instrument(skip(state))]
pub async fn submit(State(state): State<AppState>) -> Response {
    let outcome = submit_checkout(
        state.session(),
        state.shop(),
        state.config().checkout_timeout,
    )
    .await;

    match outcome {
        SubmitOutcome::Completed(receipt) => Json(CheckoutView::Success { receipt }).into_response(),
        SubmitOutcome::Failed(reason) => Json(CheckoutView::Failure { reason }).into_response(),
        SubmitOutcome::EmptyCart => Json(CheckoutView::Empty).into_response(),
        SubmitOutcome::AlreadySubmitting => {
            (StatusCode::CONFLICT, Json(CheckoutView::InFlight)).into_response()
        }
    }
}

/// Dismiss a checkout result notice, returning the coordinator to idle.
#[instrument(skip(state))]
pub async fn acknowledge(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session().lock().await;
    let acknowledged = session.acknowledge_checkout();
    Json(serde_json::json!({ "acknowledged": acknowledged }))
}

/// Recorded sales, newest first, with a recomputed total.
#[instrument(skip(state))]
pub async fn history(State(state): State<AppState>) -> Result<Json<HistoryView>> {
    let records = state.shop().fetch_history().await?;
    let total = history_total(&records);
    let symbol = records
        .first()
        .map_or("₱", |record| record.price.currency_code.symbol());

    Ok(Json(HistoryView {
        records: records.iter().map(SaleRecordView::from).collect(),
        total: format!("{symbol}{total:.2}"),
    }))
}
