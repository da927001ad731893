//! Wire types for the shop backend and their normalization.
//!
//! The backend's product JSON is loosely typed: `price` and `stock` arrive as
//! numbers or strings depending on the code path that produced them, variant
//! axes appear under singular or plural keys, and `hidden` may be a real
//! boolean or a 0/1. Everything is coerced here, at the boundary, into the
//! strict [`Item`] shape; rows that cannot be coerced are skipped with a
//! warning rather than poisoning the whole fetch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, de};
use tracing::warn;

use tindahan_core::{Price, ProductId, SaleId};

use crate::catalog::{Item, VariantAxis};

use super::SaleRecord;

/// Product row as the backend sends it.
#[derive(Debug, Deserialize)]
pub(super) struct RawProduct {
    id: i32,
    name: String,
    #[serde(deserialize_with = "flexible_decimal")]
    price: Decimal,
    #[serde(deserialize_with = "flexible_u32")]
    stock: u32,
    #[serde(default, alias = "size")]
    sizes: Option<Vec<String>>,
    #[serde(default, alias = "color")]
    colors: Option<Vec<String>>,
    #[serde(default, alias = "type")]
    types: Option<Vec<String>>,
    #[serde(default, deserialize_with = "flexible_bool")]
    hidden: bool,
}

impl RawProduct {
    /// Normalize into the strict item shape. Axis order is fixed as
    /// size, color, type - the order the register displays them in.
    fn into_item(self) -> Option<Item> {
        if self.price.is_sign_negative() {
            warn!(id = self.id, name = %self.name, "Skipping product with negative price");
            return None;
        }

        let mut axes = Vec::new();
        for (name, labels) in [
            ("size", self.sizes),
            ("color", self.colors),
            ("type", self.types),
        ] {
            if let Some(labels) = labels
                && !labels.is_empty()
            {
                axes.push(VariantAxis {
                    name: name.to_string(),
                    labels,
                });
            }
        }

        Some(Item {
            id: ProductId::new(self.id),
            name: self.name,
            price: Price::php(self.price),
            stock: self.stock,
            axes,
            hidden: self.hidden,
        })
    }
}

/// The product list endpoint answers either a bare array or `{"data": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum ItemsResponse {
    List(Vec<serde_json::Value>),
    Wrapped { data: Vec<serde_json::Value> },
}

impl ItemsResponse {
    /// Normalize every row, skipping the ones that do not coerce.
    pub(super) fn into_items(self) -> Vec<Item> {
        let rows = match self {
            Self::List(rows) | Self::Wrapped { data: rows } => rows,
        };

        rows.into_iter()
            .filter_map(|row| match serde_json::from_value::<RawProduct>(row) {
                Ok(raw) => raw.into_item(),
                Err(e) => {
                    warn!(error = %e, "Skipping malformed product row");
                    None
                }
            })
            .collect()
    }
}

/// Sale history row as the backend sends it.
#[derive(Debug, Deserialize)]
pub(super) struct RawSale {
    id: i32,
    product_id: i32,
    product_name: String,
    #[serde(deserialize_with = "flexible_u32")]
    quantity: u32,
    #[serde(deserialize_with = "flexible_decimal")]
    price: Decimal,
    checked_out_at: DateTime<Utc>,
}

impl From<RawSale> for SaleRecord {
    fn from(raw: RawSale) -> Self {
        Self {
            id: SaleId::new(raw.id),
            product_id: ProductId::new(raw.product_id),
            product_name: raw.product_name,
            quantity: raw.quantity,
            price: Price::php(raw.price),
            checked_out_at: raw.checked_out_at,
        }
    }
}

// =============================================================================
// Flexible scalar deserializers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(serde_json::Number),
    String(String),
}

/// Accept a decimal as a JSON number or a numeric string.
fn flexible_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s.trim().to_string(),
    };
    raw.parse::<Decimal>()
        .map_err(|e| de::Error::custom(format!("invalid decimal {raw:?}: {e}")))
}

/// Accept a count as a JSON integer or a numeric string. Negative counts are
/// malformed, not coerced.
fn flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s.trim().to_string(),
    };
    raw.parse::<u32>()
        .map_err(|e| de::Error::custom(format!("invalid count {raw:?}: {e}")))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseBool {
    Bool(bool),
    Number(i64),
    String(String),
}

/// Accept a flag as a boolean, a 0/1 integer, or a string form of either.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match LooseBool::deserialize(deserializer)? {
        LooseBool::Bool(b) => Ok(b),
        LooseBool::Number(n) => Ok(n != 0),
        LooseBool::String(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" | "" => Ok(false),
            other => Err(de::Error::custom(format!("invalid flag {other:?}"))),
        },
    }
}
