use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, RwLock};

use crate::{error::AppResult, models::FilterCriteria};

/// Signed-in user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub name: String,
}

/// Shared application state
///
/// Cloning is cheap; every clone observes the same session and filters.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<AppStateInner>>,
    filters_tx: Arc<watch::Sender<FilterCriteria>>,
}

/// Inner state that can be modified
#[derive(Default)]
struct AppStateInner {
    user: Option<User>,
    token: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a signed-out state with no filters applied
    pub fn new() -> Self {
        let (filters_tx, _) = watch::channel(FilterCriteria::default());
        Self {
            inner: Arc::new(RwLock::new(AppStateInner::default())),
            filters_tx: Arc::new(filters_tx),
        }
    }

    pub async fn login_success(&self, user: User, token: String) {
        let mut inner = self.inner.write().await;
        tracing::info!(user_id = user.id, "Session started");
        inner.user = Some(user);
        inner.token = Some(token);
    }

    /// Restores a previously issued token without user details
    pub async fn set_token(&self, token: String) {
        self.inner.write().await.token = Some(token);
    }

    pub async fn logout(&self) {
        let mut inner = self.inner.write().await;
        if let Some(user) = inner.user.take() {
            tracing::info!(user_id = user.id, "Session ended");
        }
        inner.token = None;
    }

    pub async fn user(&self) -> Option<User> {
        self.inner.read().await.user.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.inner.read().await.token.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.read().await.token.is_some()
    }

    /// Normalizes, validates and publishes new filters
    ///
    /// Subscribers are only woken when the normalized value actually differs.
    pub fn set_filters(&self, filters: FilterCriteria) -> AppResult<FilterCriteria> {
        let filters = filters.normalized();
        filters.validate()?;

        let changed = self.filters_tx.send_if_modified(|current| {
            if *current == filters {
                false
            } else {
                *current = filters.clone();
                true
            }
        });

        if changed {
            tracing::debug!(filters = ?filters, "Filters updated");
        }

        Ok(filters)
    }

    pub fn clear_filters(&self) {
        self.filters_tx.send_if_modified(|current| {
            if current.is_default() {
                false
            } else {
                *current = FilterCriteria::default();
                true
            }
        });
    }

    pub fn filters(&self) -> FilterCriteria {
        self.filters_tx.borrow().clone()
    }

    /// Receiver that yields whenever the applied filters change
    pub fn subscribe_filters(&self) -> watch::Receiver<FilterCriteria> {
        self.filters_tx.subscribe()
    }

    /// Drops the session and the filters, as on a fresh login or sign-up
    pub async fn reset(&self) {
        tracing::info!("Resetting application state");
        self.logout().await;
        self.clear_filters();
    }
}
