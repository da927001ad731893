//! Application state shared across handlers.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::PosConfig;
use crate::session::PosSession;
use crate::shop_api::ShopApiClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The register session sits
/// behind an async mutex: one logical thread of control, with the checkout
/// driver releasing the lock across its service call so the cart stays
/// usable while a submission is in flight.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PosConfig,
    shop: ShopApiClient,
    session: Mutex<PosSession>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: PosConfig) -> Self {
        let shop = ShopApiClient::new(&config.shop_api);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                shop,
                session: Mutex::new(PosSession::new()),
            }),
        }
    }

    /// Get a reference to the POS configuration.
    #[must_use]
    pub fn config(&self) -> &PosConfig {
        &self.inner.config
    }

    /// Get a reference to the shop backend API client.
    #[must_use]
    pub fn shop(&self) -> &ShopApiClient {
        &self.inner.shop
    }

    /// Get a reference to the register session.
    #[must_use]
    pub fn session(&self) -> &Mutex<PosSession> {
        &self.inner.session
    }
}
