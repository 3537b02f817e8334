use std::sync::Arc;

use tokio::sync::watch;

use super::{controller::FeedController, scroll::ScrollObserver};
use crate::models::FilterCriteria;

/// Reloads the feed each time the published filters change
///
/// A change that arrives while a reload is still fetching drops that reload
/// and starts over with the newer filters. Returns once every sender of the
/// channel is gone.
pub async fn watch_filters(
    controller: Arc<FeedController>,
    observer: Arc<ScrollObserver>,
    mut filters: watch::Receiver<FilterCriteria>,
) {
    'watch: while filters.changed().await.is_ok() {
        loop {
            let next = filters.borrow_and_update().clone();
            observer.reset();

            tokio::select! {
                result = controller.on_filters_changed(next) => {
                    match result {
                        Ok(outcome) => tracing::debug!(?outcome, "Feed reloaded for new filters"),
                        Err(e) => tracing::warn!(error = %e, "Feed reload failed"),
                    }
                    break;
                }
                changed = filters.changed() => {
                    if changed.is_err() {
                        break 'watch;
                    }
                    tracing::debug!("Filters changed again, superseding reload");
                }
            }
        }
    }

    tracing::debug!("Filter channel closed, stopping watcher");
}
