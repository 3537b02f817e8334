pub mod providers;
pub mod retry;
pub mod title_search;

pub use providers::{PageFetcher, PostActions, PostApiClient};
pub use retry::{retry_with_backoff, retry_with_backoff_if};
pub use title_search::{search_titles, TitleSearcher};
