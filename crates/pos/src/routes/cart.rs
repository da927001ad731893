//! Cart route handlers.

use axum::{Json, extract::Path, extract::State, response::IntoResponse};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use tindahan_core::{LineId, ProductId};

use crate::cart::{CartEngine, CartLine, QuantityChange, VariantSelection};
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Cart line display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub selection: VariantSelection,
    pub quantity: u32,
    pub unit_price: String,
    pub line_total: String,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            id: line.id,
            product_id: line.product_id,
            name: line.name.clone(),
            selection: line.selection.clone(),
            quantity: line.quantity,
            unit_price: line.price.display(),
            line_total: format!(
                "{}{:.2}",
                line.price.currency_code.symbol(),
                line.price.line_total(line.quantity)
            ),
        }
    }
}

/// Cart display data.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub line_count: usize,
}

impl From<&CartEngine> for CartView {
    fn from(cart: &CartEngine) -> Self {
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            total: cart.total().display(),
            line_count: cart.len(),
        }
    }
}

/// Variant choice body.
#[derive(Debug, Deserialize)]
pub struct SelectForm {
    pub item_id: i32,
    pub axis: String,
    pub label: String,
}

/// Add to cart body.
#[derive(Debug, Deserialize)]
pub struct AddForm {
    pub item_id: i32,
    pub quantity: Option<u32>,
}

/// Quantity adjustment body.
#[derive(Debug, Deserialize)]
pub struct UpdateForm {
    pub delta: i64,
}

/// Show the cart with its recomputed total.
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session().lock().await;
    Json(CartView::from(session.cart()))
}

/// Record a variant axis choice for an item.
#[instrument(skip(state))]
pub async fn select(
    State(state): State<AppState>,
    Json(form): Json<SelectForm>,
) -> impl IntoResponse {
    let mut session = state.session().lock().await;
    session.select_variant(ProductId::new(form.item_id), form.axis, form.label);
    Json(CartView::from(session.cart()))
}

/// Add an item to the cart under its recorded selection.
#[instrument(skip(state))]
pub async fn add(
    State(state): State<AppState>,
    Json(form): Json<AddForm>,
) -> Result<Json<CartView>> {
    let mut session = state.session().lock().await;
    session.add_to_cart(ProductId::new(form.item_id), form.quantity.unwrap_or(1))?;
    Ok(Json(CartView::from(session.cart())))
}

/// Adjust a line's quantity by a delta.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(form): Json<UpdateForm>,
) -> Result<Json<CartView>> {
    let mut session = state.session().lock().await;
    match session.update_quantity(LineId::new(id), form.delta) {
        QuantityChange::Clamped(_) | QuantityChange::Removed => {
            Ok(Json(CartView::from(session.cart())))
        }
        QuantityChange::UnknownLine => Err(AppError::NotFound(format!("cart line {id}"))),
    }
}

/// Remove a line. Idempotent: removing an absent line succeeds.
#[instrument(skip(state))]
pub async fn remove(State(state): State<AppState>, Path(id): Path<u64>) -> impl IntoResponse {
    let mut session = state.session().lock().await;
    session.remove_line(LineId::new(id));
    Json(CartView::from(session.cart()))
}

/// Empty the cart by explicit operator action.
#[instrument(skip(state))]
pub async fn clear(State(state): State<AppState>) -> impl IntoResponse {
    let mut session = state.session().lock().await;
    session.clear_cart();
    Json(CartView::from(session.cart()))
}
