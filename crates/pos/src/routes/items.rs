//! Catalog route handlers.

use axum::{Json, extract::Path, extract::State, response::IntoResponse};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use tindahan_core::{ProductId, StockStatus};

use crate::catalog::{Item, VariantAxis};
use crate::error::Result;
use crate::shop_api::{CatalogProvider, ItemChange};
use crate::state::AppState;

/// Item display data.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub stock: u32,
    pub status: StockStatus,
    pub axes: Vec<VariantAxis>,
    pub hidden: bool,
}

impl From<&Item> for ItemView {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            price: item.price.display(),
            stock: item.stock,
            status: item.stock_status(),
            axes: item.axes.clone(),
            hidden: item.hidden,
        }
    }
}

/// Result of a catalog refresh.
#[derive(Debug, Serialize)]
pub struct RefreshView {
    /// Items now in the snapshot.
    pub count: usize,
    /// Cart lines dropped because their item sold out or left the catalog.
    pub removed_lines: usize,
}

/// Visibility toggle body.
#[derive(Debug, Deserialize)]
pub struct VisibilityForm {
    pub hidden: bool,
}

/// Operator price/stock correction body.
#[derive(Debug, Deserialize)]
pub struct ItemChangeForm {
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
}

/// List sellable items.
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session().lock().await;
    let items: Vec<ItemView> = session
        .catalog()
        .visible_items()
        .into_iter()
        .map(ItemView::from)
        .collect();
    Json(items)
}

/// List hidden items.
#[instrument(skip(state))]
pub async fn hidden(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session().lock().await;
    let items: Vec<ItemView> = session
        .catalog()
        .hidden_items()
        .into_iter()
        .map(ItemView::from)
        .collect();
    Json(items)
}

/// Fetch the catalog from the backend, swap the snapshot, re-clamp the cart.
///
/// A failed fetch returns an error and leaves the previous snapshot (and the
/// cart) untouched.
#[instrument(skip(state))]
pub async fn refresh(State(state): State<AppState>) -> Result<Json<RefreshView>> {
    let items = state.shop().fetch_items().await?;

    let mut session = state.session().lock().await;
    let removed = session.refresh_catalog(items);
    if !removed.is_empty() {
        info!(
            count = removed.len(),
            "Dropped cart lines for sold-out items on refresh"
        );
    }

    Ok(Json(RefreshView {
        count: session.catalog().len(),
        removed_lines: removed.len(),
    }))
}

/// Relay a visibility toggle to the backend, then refresh.
#[instrument(skip(state))]
pub async fn set_visibility(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<VisibilityForm>,
) -> Result<Json<RefreshView>> {
    let id = ProductId::new(id);
    state.shop().set_hidden(id, form.hidden).await?;
    refresh(State(state)).await
}

/// Relay an operator price/stock correction to the backend, then refresh.
#[instrument(skip(state, form))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(form): Json<ItemChangeForm>,
) -> Result<Json<RefreshView>> {
    let id = ProductId::new(id);
    let change = ItemChange {
        price: form.price,
        stock: form.stock,
    };
    state.shop().update_item(id, &change).await?;
    refresh(State(state)).await
}
