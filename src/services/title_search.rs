use crate::{error::AppResult, models::Item};

/// Queries shorter than this never reach the backend
const MIN_QUERY_LEN: usize = 3;

/// Catalog search by free text
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TitleSearcher: Send + Sync {
    async fn search(&self, query: &str) -> AppResult<Vec<Item>>;
}

/// Service function for title search
///
/// Short queries return no results without a network round trip.
pub async fn search_titles(searcher: &dyn TitleSearcher, query: &str) -> AppResult<Vec<Item>> {
    let query = query.trim();
    if query.chars().count() < MIN_QUERY_LEN {
        return Ok(Vec::new());
    }
    searcher.search(query).await
}
