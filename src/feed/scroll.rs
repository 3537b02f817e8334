use std::sync::atomic::{AtomicUsize, Ordering};

use super::controller::{FeedController, FeedResult, LoadOutcome};

/// Number of items below `index` in a list of `len` items
pub fn remaining_after(index: usize, len: usize) -> usize {
    len.saturating_sub(index.saturating_add(1))
}

/// Turns carousel position changes into load-more triggers
///
/// Shared by reference with the filter watcher, which resets the position
/// whenever the feed is replaced.
#[derive(Debug)]
pub struct ScrollObserver {
    threshold: usize,
    current_index: AtomicUsize,
}

impl ScrollObserver {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            current_index: AtomicUsize::new(0),
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn current_index(&self) -> usize {
        self.current_index.load(Ordering::Relaxed)
    }

    /// Records the item now on screen and asks for more if the end is close
    pub async fn on_index_changed(
        &self,
        controller: &FeedController,
        index: usize,
    ) -> FeedResult<LoadOutcome> {
        self.current_index.store(index, Ordering::Relaxed);
        let remaining = remaining_after(index, controller.len());
        controller.on_approaching_end(remaining, self.threshold).await
    }

    /// Resets position after the feed was replaced
    pub fn reset(&self) {
        self.current_index.store(0, Ordering::Relaxed);
    }
}
