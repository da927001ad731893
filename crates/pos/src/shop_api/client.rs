//! HTTP client for the shop backend API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use uuid::Uuid;

use tindahan_core::ProductId;

use crate::cart::VariantSelection;
use crate::catalog::Item;
use crate::checkout::{CheckoutReceipt, CheckoutRequest};
use crate::config::ShopApiConfig;

use super::wire::{ItemsResponse, RawSale};
use super::{CatalogProvider, CheckoutService, ItemChange, SaleRecord, ShopApiError};

/// Client for the shop backend's JSON API.
///
/// Cheaply cloneable via `Arc`. Every request carries a bearer token when one
/// is configured.
#[derive(Clone)]
pub struct ShopApiClient {
    inner: Arc<ShopApiClientInner>,
}

struct ShopApiClientInner {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ShopApiClient {
    /// Create a new shop API client.
    #[must_use]
    pub fn new(config: &ShopApiConfig) -> Self {
        Self {
            inner: Arc::new(ShopApiClientInner {
                client: reqwest::Client::new(),
                base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
                token: config
                    .token
                    .as_ref()
                    .map(|token| token.expose_secret().to_string()),
            }),
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.inner.base_url);
        let mut builder = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &self.inner.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Check the status and parse the body, logging a snippet on failure.
    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ShopApiError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Shop API returned non-success status"
            );
            return Err(ShopApiError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse shop API response"
            );
            ShopApiError::Parse(e)
        })
    }

    /// Check the status and discard the body.
    async fn ensure_success(response: reqwest::Response) -> Result<(), ShopApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await?;
        tracing::error!(
            status = %status,
            body = %body.chars().take(500).collect::<String>(),
            "Shop API returned non-success status"
        );
        Err(ShopApiError::Status {
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        })
    }

    /// Toggle an item's hidden flag on the backend. Catalog metadata only.
    ///
    /// # Errors
    ///
    /// Returns `ShopApiError` if the request fails or the backend refuses.
    #[instrument(skip(self))]
    pub async fn set_hidden(&self, id: ProductId, hidden: bool) -> Result<(), ShopApiError> {
        #[derive(Serialize)]
        struct VisibilityBody {
            hidden: bool,
        }

        let response = self
            .request(Method::PUT, &format!("/api/products/{id}/visibility"))
            .json(&VisibilityBody { hidden })
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(%id, hidden, "Updated product visibility");
        Ok(())
    }

    /// Send an operator price/stock correction to the backend.
    ///
    /// # Errors
    ///
    /// Returns `ShopApiError` if the request fails or the backend refuses.
    #[instrument(skip(self, change))]
    pub async fn update_item(&self, id: ProductId, change: &ItemChange) -> Result<(), ShopApiError> {
        let response = self
            .request(Method::PATCH, &format!("/api/products/{id}"))
            .json(change)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(%id, "Updated product");
        Ok(())
    }

    /// Fetch the recorded sale history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopApiError` if the request fails or the body is malformed.
    #[instrument(skip(self))]
    pub async fn fetch_history(&self) -> Result<Vec<SaleRecord>, ShopApiError> {
        let response = self
            .request(Method::GET, "/api/products/history")
            .send()
            .await?;
        let raw: Vec<RawSale> = Self::read_json(response).await?;
        Ok(raw.into_iter().map(SaleRecord::from).collect())
    }
}

#[async_trait]
impl CatalogProvider for ShopApiClient {
    #[instrument(skip(self))]
    async fn fetch_items(&self) -> Result<Vec<Item>, ShopApiError> {
        let response = self.request(Method::GET, "/api/products").send().await?;
        let raw: ItemsResponse = Self::read_json(response).await?;
        let items = raw.into_items();
        debug!(count = items.len(), "Fetched catalog");
        Ok(items)
    }
}

#[async_trait]
impl CheckoutService for ShopApiClient {
    #[instrument(skip(self, request), fields(key = %request.idempotency_key))]
    async fn checkout(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt, ShopApiError> {
        #[derive(Serialize)]
        struct CheckoutBody<'a> {
            idempotency_key: Uuid,
            lines: Vec<CheckoutLineBody<'a>>,
        }

        #[derive(Serialize)]
        struct CheckoutLineBody<'a> {
            product_id: ProductId,
            quantity: u32,
            selection: &'a VariantSelection,
        }

        let body = CheckoutBody {
            idempotency_key: request.idempotency_key,
            lines: request
                .lines
                .iter()
                .map(|line| CheckoutLineBody {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    selection: &line.selection,
                })
                .collect(),
        };

        let response = self
            .request(Method::POST, "/api/checkout")
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        // A client-error status is the backend refusing the submission;
        // surface its message as the rejection reason.
        if status.is_client_error() {
            #[derive(serde::Deserialize)]
            struct ErrorMessage {
                #[serde(default)]
                message: Option<String>,
            }

            let body = response.text().await?;
            let reason = serde_json::from_str::<ErrorMessage>(&body)
                .ok()
                .and_then(|e| e.message)
                .unwrap_or_else(|| format!("checkout refused with status {status}"));
            return Err(ShopApiError::Rejected(reason));
        }

        if !status.is_success() {
            let body = response.text().await?;
            return Err(ShopApiError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        // 204 means recorded with nothing echoed back; assume the submitted
        // quantities were applied.
        if status == StatusCode::NO_CONTENT {
            return Ok(CheckoutReceipt {
                applied: Vec::new(),
                reference: None,
                recorded_at: None,
            });
        }

        Self::read_json(response).await
    }
}
