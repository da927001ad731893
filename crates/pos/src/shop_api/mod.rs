//! Shop backend API boundary.
//!
//! The POS owns no durable state: the product list, visibility flags, sale
//! recording, and checkout history all live behind the shop backend's JSON
//! API. This module defines the collaborator contracts the engine consumes
//! ([`CatalogProvider`], [`CheckoutService`]) and the `reqwest` client that
//! implements them. Loosely-typed backend JSON is normalized into the strict
//! [`Item`](crate::catalog::Item) shape in `wire` before it ever reaches the
//! cart engine.

mod client;
mod wire;

pub use client::ShopApiClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use tindahan_core::{Price, ProductId, SaleId};

use crate::catalog::Item;
use crate::checkout::{CheckoutReceipt, CheckoutRequest};

/// Errors that can occur when talking to the shop backend.
#[derive(Debug, Error)]
pub enum ShopApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Backend returned a non-success status.
    #[error("shop API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Backend refused the checkout submission.
    #[error("checkout rejected: {0}")]
    Rejected(String),
}

/// Read side of the product catalog.
///
/// A failed fetch must leave the caller's previous snapshot untouched, which
/// follows naturally from returning `Err` instead of a partial list.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch the full item list, normalized.
    async fn fetch_items(&self) -> Result<Vec<Item>, ShopApiError>;
}

/// The checkout service: one request carrying the full line set, applied
/// atomically by the backend or not at all.
#[async_trait]
pub trait CheckoutService: Send + Sync {
    /// Record a sale for every submitted line and decrement backend stock.
    async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, ShopApiError>;
}

/// Operator correction to an item's price or stock.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ItemChange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
}

/// One recorded sale line from the backend's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleRecord {
    pub id: SaleId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub price: Price,
    pub checked_out_at: DateTime<Utc>,
}

impl SaleRecord {
    /// Extended amount for this sale line.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.price.line_total(self.quantity)
    }
}

/// Running total over a set of sale records, recomputed per call.
#[must_use]
pub fn history_total(records: &[SaleRecord]) -> Decimal {
    records.iter().map(SaleRecord::subtotal).sum()
}
