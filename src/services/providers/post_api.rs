/// REST backend client for feed pages, catalog search and post actions
use std::time::Duration;

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{ApiPost, CatalogId, ExclusionSet, FilterCriteria, Item},
    services::{
        providers::{PageFetcher, PostActions},
        title_search::TitleSearcher,
    },
    store::AppState,
};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use serde::Serialize;
use uuid::Uuid;

const FEED_PATH: &str = "/post/feed";
const SEARCH_PATH: &str = "/post/search";
const POST_PATH: &str = "/post";
const IMPLICIT_POST_PATH: &str = "/implicit/post";
const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Serialize)]
struct FeedRequest<'a> {
    filters: &'a FilterCriteria,
    exclude: Vec<CatalogId>,
    limit: usize,
}

#[derive(Debug, Serialize)]
struct ViewTimeRequest {
    /// Milliseconds
    time_seen: u64,
}

#[derive(Clone)]
pub struct PostApiClient {
    http_client: HttpClient,
    api_url: String,
    page_size: usize,
    session: AppState,
}

impl PostApiClient {
    pub fn new(config: &Config, session: AppState) -> AppResult<Self> {
        let http_client = HttpClient::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http_client,
            api_url: config.api_base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            session,
        })
    }

    /// Attaches the session token and a fresh request id
    async fn authenticated(&self, request: RequestBuilder) -> AppResult<(RequestBuilder, Uuid)> {
        let token = self.session.token().await.ok_or(AppError::Unauthorized)?;
        let request_id = Uuid::new_v4();

        let request = request
            .bearer_auth(token)
            .header(REQUEST_ID_HEADER, request_id.to_string());

        Ok((request, request_id))
    }

    /// Turns a non-success status into `AppError::Server`
    async fn check_status(response: Response, request_id: Uuid) -> AppResult<Response> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                request_id = %request_id,
                status = %status,
                body = %body,
                "Backend request failed"
            );
            return Err(AppError::Server {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    /// Decodes a list of posts, skipping entries that cannot become items
    async fn read_posts(response: Response, request_id: Uuid) -> AppResult<Vec<Item>> {
        let response = Self::check_status(response, request_id).await?;
        let body = response.bytes().await?;
        let posts: Vec<ApiPost> =
            serde_json::from_slice(&body).map_err(|e| AppError::Decode(e.to_string()))?;

        Ok(into_items(posts, request_id))
    }

    /// Sends a post action whose response body is ignored
    async fn send_action(
        &self,
        request: RequestBuilder,
        item_id: u64,
        action: &str,
    ) -> AppResult<()> {
        let (request, request_id) = self.authenticated(request).await?;
        let response = request.send().await?;
        Self::check_status(response, request_id).await?;

        tracing::debug!(request_id = %request_id, item_id, action, "Post action sent");
        Ok(())
    }

    fn post_url(&self, item_id: u64, action: &str) -> String {
        format!("{}{}/{}/{}", self.api_url, POST_PATH, item_id, action)
    }
}

fn into_items(posts: Vec<ApiPost>, request_id: Uuid) -> Vec<Item> {
    posts
        .into_iter()
        .filter_map(|post| match Item::try_from(post) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Skipping unusable post");
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl PageFetcher for PostApiClient {
    async fn fetch_page(
        &self,
        filters: &FilterCriteria,
        exclude: &ExclusionSet,
    ) -> AppResult<Vec<Item>> {
        let url = format!("{}{}", self.api_url, FEED_PATH);
        let body = FeedRequest {
            filters,
            exclude: exclude.to_vec(),
            limit: self.page_size,
        };

        let (request, request_id) = self
            .authenticated(self.http_client.post(&url).json(&body))
            .await?;

        tracing::debug!(
            request_id = %request_id,
            excluded = exclude.len(),
            "Requesting feed page"
        );

        let response = request.send().await?;
        let items = Self::read_posts(response, request_id).await?;

        tracing::info!(
            request_id = %request_id,
            results = items.len(),
            provider = self.name(),
            "Feed page fetched"
        );

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "post_api"
    }
}

#[async_trait::async_trait]
impl TitleSearcher for PostApiClient {
    async fn search(&self, query: &str) -> AppResult<Vec<Item>> {
        let url = format!("{}{}", self.api_url, SEARCH_PATH);
        let (request, request_id) = self
            .authenticated(self.http_client.get(&url).query(&[("q", query)]))
            .await?;

        let response = request.send().await?;
        let items = Self::read_posts(response, request_id).await?;

        tracing::info!(
            request_id = %request_id,
            query = %query,
            results = items.len(),
            provider = PageFetcher::name(self),
            "Title search completed"
        );

        Ok(items)
    }
}

#[async_trait::async_trait]
impl PostActions for PostApiClient {
    async fn set_liked(&self, item_id: u64, liked: bool) -> AppResult<()> {
        let url = self.post_url(item_id, "like");
        let request = if liked {
            self.http_client.post(&url)
        } else {
            self.http_client.delete(&url)
        };
        self.send_action(request, item_id, if liked { "like" } else { "unlike" })
            .await
    }

    async fn mark_seen(&self, item_id: u64) -> AppResult<()> {
        let url = self.post_url(item_id, "seen");
        self.send_action(self.http_client.post(&url), item_id, "seen")
            .await
    }

    async fn report_view_time(&self, item_id: u64, time_seen: Duration) -> AppResult<()> {
        let url = format!(
            "{}{}/{}/post_seen",
            self.api_url, IMPLICIT_POST_PATH, item_id
        );
        let body = ViewTimeRequest {
            time_seen: u64::try_from(time_seen.as_millis()).unwrap_or(u64::MAX),
        };
        self.send_action(self.http_client.post(&url).json(&body), item_id, "post_seen")
            .await
    }
}
