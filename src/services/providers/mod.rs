/// Feed data providers
///
/// The feed controller only talks to the backend through [`PageFetcher`], so the
/// transport can be swapped (HTTP client, fakes in tests) without touching the
/// pagination logic.
use std::time::Duration;

use crate::{
    error::AppResult,
    models::{ExclusionSet, FilterCriteria, Item},
};

pub mod post_api;

pub use post_api::PostApiClient;

/// Fetches one page of feed items
///
/// Implementations must not return items whose catalog id is in `exclude`.
/// There is no cursor: the exclusion set is the only thing preventing repeats.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// Returns up to one page of items matching `filters`, skipping `exclude`
    ///
    /// An empty page means the backend has nothing more for these filters.
    async fn fetch_page(
        &self,
        filters: &FilterCriteria,
        exclude: &ExclusionSet,
    ) -> AppResult<Vec<Item>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Per-post user actions sent to the backend
///
/// Items are addressed by `item_id`, the backend post id.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PostActions: Send + Sync {
    async fn set_liked(&self, item_id: u64, liked: bool) -> AppResult<()>;

    async fn mark_seen(&self, item_id: u64) -> AppResult<()>;

    /// Implicit feedback: how long the item stayed on screen
    async fn report_view_time(&self, item_id: u64, time_seen: Duration) -> AppResult<()>;
}
