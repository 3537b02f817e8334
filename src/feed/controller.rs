use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use serde::Serialize;

use crate::{
    error::AppError,
    models::{ExclusionSet, FilterCriteria, Item},
    services::providers::{PageFetcher, PostActions},
};

/// Errors surfaced by feed operations
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    #[error("Failed to fetch feed page: {0}")]
    FetchFailed(#[source] AppError),

    #[error("Post action failed: {0}")]
    ActionFailed(#[source] AppError),

    #[error("Item {0} is not in the feed")]
    ItemNotFound(u64),
}

impl FeedError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::FetchFailed(e) | FeedError::ActionFailed(e) => e.is_retryable(),
            FeedError::ItemNotFound(_) => false,
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;

/// Why an operation did not issue a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// More items remain than the threshold
    NotNearEnd,
    /// Another fetch is in flight; the trigger is dropped, not queued
    AlreadyFetching,
    /// The new filters equal the current ones, which are loaded or loading
    FiltersUnchanged,
}

/// Result of a feed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The list now holds exactly the fetched page
    Replaced { received: usize, accepted: usize },
    /// The fetched page was appended after deduplication
    Appended { received: usize, accepted: usize },
    Skipped(SkipReason),
    /// The filters changed while the fetch was in flight; nothing was applied
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadMode {
    Replace,
    Append,
}

/// Read-only copy of the feed state for rendering
#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub items: Vec<Item>,
    pub is_fetching: bool,
    pub generation: u64,
    pub end_reached: bool,
    pub filters: FilterCriteria,
}

#[derive(Debug, Default)]
struct FeedState {
    items: Vec<Item>,
    exclusion: ExclusionSet,
    filters: FilterCriteria,
    /// Bumped on every reset; results from older generations are dropped
    generation: u64,
    /// Fetch currently holding the single-flight guard
    in_flight: Option<InFlight>,
    next_ticket: u64,
    end_reached: bool,
    /// A page has been applied since the last reset
    loaded: bool,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    ticket: u64,
    mode: LoadMode,
}

/// Everything a fetch needs, captured when it starts
struct PendingFetch {
    ticket: u64,
    generation: u64,
    filters: FilterCriteria,
    exclude: ExclusionSet,
}

impl FeedState {
    fn reset(&mut self, filters: FilterCriteria) {
        self.items.clear();
        self.exclusion.clear();
        self.filters = filters;
        self.generation += 1;
        self.end_reached = false;
        self.loaded = false;
    }

    /// Whether `filters` are already shown, or on their way
    fn serves(&self, filters: &FilterCriteria) -> bool {
        let replacing = matches!(
            self.in_flight,
            Some(InFlight {
                mode: LoadMode::Replace,
                ..
            })
        );
        self.filters == *filters && (self.loaded || replacing)
    }

    /// Takes the guard with a fresh ticket, superseding any older holder
    fn begin_fetch(&mut self, mode: LoadMode) -> PendingFetch {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.in_flight = Some(InFlight { ticket, mode });

        PendingFetch {
            ticket,
            generation: self.generation,
            filters: self.filters.clone(),
            exclude: self.exclusion.clone(),
        }
    }

    fn apply_page(&mut self, page: Vec<Item>, mode: LoadMode) -> LoadOutcome {
        let received = page.len();
        let mut accepted = Vec::with_capacity(received);

        for item in page {
            if self.exclusion.insert(item.catalog_id) {
                accepted.push(item);
            } else {
                tracing::warn!(
                    catalog_id = %item.catalog_id,
                    item_id = item.item_id,
                    "Dropping already served item"
                );
            }
        }

        let accepted_count = accepted.len();
        self.end_reached = received == 0;
        self.loaded = true;

        match mode {
            LoadMode::Replace => {
                self.items = accepted;
                LoadOutcome::Replaced {
                    received,
                    accepted: accepted_count,
                }
            }
            LoadMode::Append => {
                self.items.extend(accepted);
                LoadOutcome::Appended {
                    received,
                    accepted: accepted_count,
                }
            }
        }
    }

    fn item_mut(&mut self, item_id: u64) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.item_id == item_id)
    }
}

/// Releases the single-flight guard when the fetch that took it finishes
///
/// Runs on every exit path, including errors and a dropped future. A ticket
/// that has been superseded by a newer fetch leaves the guard alone.
struct FetchGuard<'a> {
    state: &'a Mutex<FeedState>,
    ticket: u64,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.in_flight.is_some_and(|f| f.ticket == self.ticket) {
            state.in_flight = None;
        }
    }
}

/// Owns the feed list and decides when to fetch
///
/// All operations take `&self`, so one controller can be shared between the
/// scroll observer and whatever reacts to filter changes.
pub struct FeedController {
    fetcher: Arc<dyn PageFetcher>,
    state: Mutex<FeedState>,
}

impl FeedController {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(FeedState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        // The state is never left half-updated across a panic point
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Starts a fresh feed for `filters` and loads the first page
    pub async fn initialize(&self, filters: FilterCriteria) -> FeedResult<LoadOutcome> {
        let pending = {
            let mut state = self.lock();
            state.reset(filters.normalized());
            state.begin_fetch(LoadMode::Replace)
        };

        tracing::info!(generation = pending.generation, "Initializing feed");
        self.load_page(pending, LoadMode::Replace).await
    }

    /// Replaces the feed when the filters actually changed
    ///
    /// Any fetch still in flight for the previous filters is discarded when it
    /// resolves. Equal filters reload too when the last replace for them failed.
    pub async fn on_filters_changed(&self, filters: FilterCriteria) -> FeedResult<LoadOutcome> {
        let filters = filters.normalized();
        let pending = {
            let mut state = self.lock();
            if state.serves(&filters) {
                return Ok(LoadOutcome::Skipped(SkipReason::FiltersUnchanged));
            }
            state.reset(filters);
            state.begin_fetch(LoadMode::Replace)
        };

        tracing::info!(
            generation = pending.generation,
            filters = ?pending.filters,
            "Filters changed, reloading feed"
        );
        self.load_page(pending, LoadMode::Replace).await
    }

    /// Appends the next page once the reader is within `threshold` items of the end
    pub async fn on_approaching_end(
        &self,
        remaining_count: usize,
        threshold: usize,
    ) -> FeedResult<LoadOutcome> {
        if remaining_count > threshold {
            return Ok(LoadOutcome::Skipped(SkipReason::NotNearEnd));
        }

        let pending = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                tracing::debug!(remaining_count, "Fetch in flight, ignoring load-more trigger");
                return Ok(LoadOutcome::Skipped(SkipReason::AlreadyFetching));
            }
            state.begin_fetch(LoadMode::Append)
        };

        self.load_page(pending, LoadMode::Append).await
    }

    async fn load_page(&self, pending: PendingFetch, mode: LoadMode) -> FeedResult<LoadOutcome> {
        let _guard = FetchGuard {
            state: &self.state,
            ticket: pending.ticket,
        };

        tracing::debug!(
            ticket = pending.ticket,
            generation = pending.generation,
            excluded = pending.exclude.len(),
            provider = self.fetcher.name(),
            ?mode,
            "Fetching feed page"
        );

        let result = self
            .fetcher
            .fetch_page(&pending.filters, &pending.exclude)
            .await;

        // The state lock is released before `_guard` drops and re-locks
        let mut state = self.lock();

        if state.generation != pending.generation {
            tracing::debug!(
                ticket = pending.ticket,
                fetched_generation = pending.generation,
                current_generation = state.generation,
                "Discarding stale feed page"
            );
            return Ok(LoadOutcome::Discarded);
        }

        match result {
            Ok(page) => {
                let outcome = state.apply_page(page, mode);
                tracing::info!(
                    generation = pending.generation,
                    outcome = ?outcome,
                    total = state.items.len(),
                    "Feed page applied"
                );
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!(
                    generation = pending.generation,
                    error = %e,
                    "Feed page fetch failed"
                );
                Err(FeedError::FetchFailed(e))
            }
        }
    }

    /// Flips the like on `item_id` right away and tells the backend
    ///
    /// The local change is rolled back if the backend call fails, unless the
    /// feed was replaced in the meantime. Returns the new liked state.
    pub async fn toggle_like(&self, actions: &dyn PostActions, item_id: u64) -> FeedResult<bool> {
        let (generation, liked) = {
            let mut state = self.lock();
            let generation = state.generation;
            let item = state
                .item_mut(item_id)
                .ok_or(FeedError::ItemNotFound(item_id))?;
            let liked = !item.liked;
            item.set_liked(liked);
            (generation, liked)
        };

        if let Err(e) = actions.set_liked(item_id, liked).await {
            tracing::warn!(item_id, liked, error = %e, "Like update failed, rolling back");
            self.revert(generation, item_id, |item| {
                if item.liked == liked {
                    item.set_liked(!liked);
                }
            });
            return Err(FeedError::ActionFailed(e));
        }

        Ok(liked)
    }

    /// Marks `item_id` as seen locally and on the backend
    ///
    /// Returns `false` without a call when the item was already seen.
    pub async fn mark_seen(&self, actions: &dyn PostActions, item_id: u64) -> FeedResult<bool> {
        let generation = {
            let mut state = self.lock();
            let generation = state.generation;
            let item = state
                .item_mut(item_id)
                .ok_or(FeedError::ItemNotFound(item_id))?;
            if item.seen {
                return Ok(false);
            }
            item.seen = true;
            generation
        };

        if let Err(e) = actions.mark_seen(item_id).await {
            tracing::warn!(item_id, error = %e, "Mark seen failed, rolling back");
            self.revert(generation, item_id, |item| item.seen = false);
            return Err(FeedError::ActionFailed(e));
        }

        Ok(true)
    }

    /// Reports how long `item_id` stayed on screen
    ///
    /// Best effort: failures are logged and never reach the caller.
    pub async fn report_view(
        &self,
        actions: &dyn PostActions,
        item_id: u64,
        time_seen: Duration,
    ) {
        if let Err(e) = actions.report_view_time(item_id, time_seen).await {
            tracing::warn!(
                item_id,
                time_seen_ms = time_seen.as_millis() as u64,
                error = %e,
                "Failed to report view time"
            );
        }
    }

    fn revert(&self, generation: u64, item_id: u64, undo: impl FnOnce(&mut Item)) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        if let Some(item) = state.item_mut(item_id) {
            undo(item);
        }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        FeedSnapshot {
            items: state.items.clone(),
            is_fetching: state.in_flight.is_some(),
            generation: state.generation,
            end_reached: state.end_reached,
            filters: state.filters.clone(),
        }
    }

    pub fn items(&self) -> Vec<Item> {
        self.lock().items.clone()
    }

    /// Copy of the item at `index`, without cloning the whole list
    pub fn get(&self, index: usize) -> Option<Item> {
        self.lock().items.get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn is_fetching(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    pub fn exclusion(&self) -> ExclusionSet {
        self.lock().exclusion.clone()
    }

    pub fn filters(&self) -> FilterCriteria {
        self.lock().filters.clone()
    }
}
