use std::{sync::Arc, time::Instant};

use reelfeed::{
    feed::{watch_filters, FeedController, FeedError, ScrollObserver},
    models::FilterCriteria,
    services::{retry_with_backoff_if, PostApiClient},
    AppState, Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "reelfeed=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Initialize application state
    let state = AppState::new();
    if let Some(token) = config.api_token.clone() {
        state.set_token(token).await;
    }
    let filters = state.set_filters(FilterCriteria::with_genres(config.genres.clone()))?;

    let client = Arc::new(PostApiClient::new(&config, state.clone())?);
    let controller = Arc::new(FeedController::new(client.clone()));
    let observer = Arc::new(ScrollObserver::new(config.load_more_threshold));

    // Later filter changes reload the feed in the background
    tokio::spawn(watch_filters(
        controller.clone(),
        observer.clone(),
        state.subscribe_filters(),
    ));

    retry_with_backoff_if(
        || controller.initialize(filters.clone()),
        config.retry_max_attempts,
        config.retry_base_delay(),
        FeedError::is_retryable,
    )
    .await?;

    let mut index = 0;

    while index < config.walk_limit && index < controller.len() {
        let Some(item) = controller.get(index) else {
            break;
        };
        let shown_at = Instant::now();
        tracing::info!(
            index,
            item_id = item.item_id,
            catalog_id = %item.catalog_id,
            title = item.title(),
            "Showing item"
        );

        if let Err(e) = controller.mark_seen(client.as_ref(), item.item_id).await {
            tracing::warn!(error = %e, item_id = item.item_id, "Could not mark item seen");
        }

        if let Err(e) = observer.on_index_changed(&controller, index).await {
            // Keep scrolling; the next position change triggers another attempt
            tracing::warn!(error = %e, index, "Load more failed");
        }

        controller
            .report_view(client.as_ref(), item.item_id, shown_at.elapsed())
            .await;

        index += 1;
    }

    let snapshot = controller.snapshot();
    tracing::info!(
        shown = index,
        loaded = snapshot.items.len(),
        end_reached = snapshot.end_reached,
        "Feed walk finished"
    );

    Ok(())
}
