use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use reelfeed::{
    feed::{FeedController, FeedError, LoadOutcome, ScrollObserver},
    models::{CatalogId, ExclusionSet, FilterCriteria},
    services::{search_titles, PageFetcher, PostApiClient},
    AppError, AppState, Config,
};

const TOKEN: &str = "test-token";

#[derive(Debug, Deserialize)]
struct FeedRequest {
    #[serde(default)]
    filters: FilterCriteria,
    exclude: Vec<u64>,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: String,
}

/// In-memory stand-in for the REST backend
#[derive(Default)]
struct FakeBackend {
    catalog: Vec<(u64, u64, &'static str, &'static str)>,
    requests: Vec<FeedRequest>,
    /// Catalog id sent back on every page regardless of the exclusion list
    resend: Option<u64>,
    fail_with: Option<StatusCode>,
    /// Post actions received, as "<action> <post id>"
    actions: Vec<String>,
}

type Shared = Arc<Mutex<FakeBackend>>;

fn post_json(post_id: u64, tmdb_id: u64, title: &str, genre: &str) -> Value {
    json!({
        "post_id": post_id,
        "entity_id": tmdb_id,
        "entity_type": "movie",
        "entity": { "tmdb_id": tmdb_id, "title": title, "genres": [genre] },
        "likes": 0,
        "comments": 0,
        "created_date": "2024-01-01T00:00:00Z"
    })
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .map(|h| h == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

async fn feed(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Json(request): Json<FeedRequest>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) || headers.get("x-request-id").is_none() {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }

    let mut backend = backend.lock().unwrap();
    if let Some(status) = backend.fail_with.take() {
        return (status, Json(json!({ "error": "unavailable" })));
    }

    let mut page: Vec<Value> = Vec::new();
    if let Some(resend) = backend.resend {
        if let Some(&(post_id, tmdb_id, title, genre)) =
            backend.catalog.iter().find(|entry| entry.1 == resend)
        {
            page.push(post_json(post_id + 1000, tmdb_id, title, genre));
        }
    }

    page.extend(
        backend
            .catalog
            .iter()
            .filter(|entry| !request.exclude.contains(&entry.1))
            .filter(|entry| {
                request.filters.genres.is_empty()
                    || request.filters.genres.iter().any(|g| g == entry.3)
            })
            .take(request.limit)
            .map(|&(post_id, tmdb_id, title, genre)| post_json(post_id, tmdb_id, title, genre)),
    );

    backend.requests.push(request);
    (StatusCode::OK, Json(Value::Array(page)))
}

async fn like(
    State(backend): State<Shared>,
    method: Method,
    headers: HeaderMap,
    Path(post_id): Path<u64>,
) -> StatusCode {
    let action = if method == Method::DELETE { "unlike" } else { "like" };
    record_action(&backend, &headers, format!("{} {}", action, post_id))
}

async fn seen(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<u64>,
) -> StatusCode {
    record_action(&backend, &headers, format!("seen {}", post_id))
}

async fn post_seen(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Path(post_id): Path<u64>,
    Json(body): Json<Value>,
) -> StatusCode {
    record_action(
        &backend,
        &headers,
        format!("post_seen {} {}", post_id, body["time_seen"]),
    )
}

fn record_action(backend: &Shared, headers: &HeaderMap, action: String) -> StatusCode {
    if !authorized(headers) {
        return StatusCode::UNAUTHORIZED;
    }
    let mut backend = backend.lock().unwrap();
    if let Some(status) = backend.fail_with.take() {
        return status;
    }
    backend.actions.push(action);
    StatusCode::NO_CONTENT
}

async fn search(
    State(backend): State<Shared>,
    headers: HeaderMap,
    Query(params): Query<SearchQuery>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" })));
    }

    let backend = backend.lock().unwrap();
    let needle = params.q.to_lowercase();
    let results: Vec<Value> = backend
        .catalog
        .iter()
        .filter(|entry| entry.2.to_lowercase().contains(&needle))
        .map(|&(post_id, tmdb_id, title, genre)| post_json(post_id, tmdb_id, title, genre))
        .collect();

    (StatusCode::OK, Json(Value::Array(results)))
}

fn sample_catalog() -> Vec<(u64, u64, &'static str, &'static str)> {
    vec![
        (1, 101, "Heat", "Action"),
        (2, 102, "Alien", "Horror"),
        (3, 103, "Die Hard", "Action"),
        (4, 104, "Amelie", "Comedy"),
        (5, 105, "Speed", "Action"),
        (6, 106, "The Thing", "Horror"),
        (7, 107, "Ronin", "Action"),
    ]
}

async fn spawn_backend(backend: FakeBackend) -> (String, Shared) {
    let shared: Shared = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/post/feed", post(feed))
        .route("/post/search", get(search))
        .route("/post/:post_id/like", post(like).delete(like))
        .route("/post/:post_id/seen", post(seen))
        .route("/implicit/post/:post_id/post_seen", post(post_seen))
        .with_state(shared.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), shared)
}

async fn create_client(base_url: &str, page_size: usize) -> PostApiClient {
    let config = Config {
        api_base_url: base_url.to_string(),
        page_size,
        ..Config::default()
    };
    let state = AppState::new();
    state.set_token(TOKEN.to_string()).await;
    PostApiClient::new(&config, state).unwrap()
}

fn titles(controller: &FeedController) -> Vec<String> {
    controller
        .items()
        .iter()
        .map(|item| item.title().to_string())
        .collect()
}

#[tokio::test]
async fn test_feed_pages_through_catalog_without_repeats() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let controller = FeedController::new(Arc::new(create_client(&url, 3).await));

    controller.initialize(FilterCriteria::default()).await.unwrap();
    assert_eq!(titles(&controller), vec!["Heat", "Alien", "Die Hard"]);

    controller.on_approaching_end(0, 4).await.unwrap();
    controller.on_approaching_end(0, 4).await.unwrap();
    let outcome = controller.on_approaching_end(0, 4).await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Appended {
            received: 0,
            accepted: 0
        }
    );
    assert_eq!(controller.len(), 7);
    assert!(controller.snapshot().end_reached);

    let backend = backend.lock().unwrap();
    assert_eq!(backend.requests.len(), 4);
    assert!(backend.requests[0].exclude.is_empty());
    assert_eq!(backend.requests[1].exclude, vec![101, 102, 103]);
    assert_eq!(backend.requests[1].limit, 3);
}

#[tokio::test]
async fn test_filter_change_sends_filters_and_fresh_exclusion() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let controller = FeedController::new(Arc::new(create_client(&url, 2).await));

    controller.initialize(FilterCriteria::default()).await.unwrap();
    controller
        .on_filters_changed(FilterCriteria::with_genres(["Action"]))
        .await
        .unwrap();

    assert_eq!(titles(&controller), vec!["Heat", "Die Hard"]);

    controller.on_approaching_end(1, 4).await.unwrap();
    assert_eq!(titles(&controller), vec!["Heat", "Die Hard", "Speed", "Ronin"]);

    let backend = backend.lock().unwrap();
    assert_eq!(backend.requests[1].filters.genres, vec!["Action"]);
    assert!(backend.requests[1].exclude.is_empty());
    assert_eq!(backend.requests[2].exclude, vec![101, 103]);
}

#[tokio::test]
async fn test_resent_items_are_dropped_client_side() {
    let (url, _backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        resend: Some(101),
        ..Default::default()
    })
    .await;
    let controller = FeedController::new(Arc::new(create_client(&url, 2).await));

    controller.initialize(FilterCriteria::default()).await.unwrap();
    let outcome = controller.on_approaching_end(0, 4).await.unwrap();

    assert_eq!(
        outcome,
        LoadOutcome::Appended {
            received: 3,
            accepted: 2
        }
    );
    let ids: Vec<CatalogId> = controller.items().iter().map(|i| i.catalog_id).collect();
    assert_eq!(
        ids,
        vec![CatalogId(101), CatalogId(102), CatalogId(103), CatalogId(104)]
    );
}

#[tokio::test]
async fn test_server_error_surfaces_as_fetch_failed() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let controller = FeedController::new(Arc::new(create_client(&url, 2).await));
    controller.initialize(FilterCriteria::default()).await.unwrap();

    backend.lock().unwrap().fail_with = Some(StatusCode::SERVICE_UNAVAILABLE);
    let err = controller.on_approaching_end(0, 4).await.unwrap_err();

    assert!(matches!(
        err,
        FeedError::FetchFailed(AppError::Server { status: 503, .. })
    ));
    assert!(err.is_retryable());
    assert!(!controller.is_fetching());
    assert_eq!(controller.len(), 2);

    // Retriggering recovers
    controller.on_approaching_end(0, 4).await.unwrap();
    assert_eq!(controller.len(), 4);
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = create_client(&format!("http://{}", addr), 2).await;
    let result = client
        .fetch_page(&FilterCriteria::default(), &ExclusionSet::new())
        .await;

    assert!(matches!(result, Err(AppError::Network(_))));
}

#[tokio::test]
async fn test_missing_token_rejected_before_request() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let config = Config {
        api_base_url: url,
        ..Config::default()
    };
    let client = PostApiClient::new(&config, AppState::new()).unwrap();

    let result = client
        .fetch_page(&FilterCriteria::default(), &ExclusionSet::new())
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized)));
    assert!(backend.lock().unwrap().requests.is_empty());
}

#[tokio::test]
async fn test_scroll_observer_drives_pagination() {
    let (url, _backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let controller = FeedController::new(Arc::new(create_client(&url, 5).await));
    controller.initialize(FilterCriteria::default()).await.unwrap();
    let observer = ScrollObserver::new(4);

    let first = observer.on_index_changed(&controller, 0).await.unwrap();
    assert_eq!(controller.len(), 7);
    assert!(matches!(first, LoadOutcome::Appended { accepted: 2, .. }));
}

#[tokio::test]
async fn test_post_actions_reach_backend() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let client = create_client(&url, 3).await;
    let controller = FeedController::new(Arc::new(client.clone()));
    controller.initialize(FilterCriteria::default()).await.unwrap();

    assert!(controller.toggle_like(&client, 2).await.unwrap());
    assert!(!controller.toggle_like(&client, 2).await.unwrap());
    assert!(controller.mark_seen(&client, 3).await.unwrap());
    controller
        .report_view(&client, 3, Duration::from_millis(1200))
        .await;

    assert_eq!(
        backend.lock().unwrap().actions,
        vec!["like 2", "unlike 2", "seen 3", "post_seen 3 1200"]
    );
}

#[tokio::test]
async fn test_rejected_like_is_rolled_back() {
    let (url, backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let client = create_client(&url, 3).await;
    let controller = FeedController::new(Arc::new(client.clone()));
    controller.initialize(FilterCriteria::default()).await.unwrap();

    backend.lock().unwrap().fail_with = Some(StatusCode::BAD_GATEWAY);
    let err = controller.toggle_like(&client, 1).await.unwrap_err();

    assert!(matches!(
        err,
        FeedError::ActionFailed(AppError::Server { status: 502, .. })
    ));
    let item = controller.get(0).unwrap();
    assert!(!item.liked);
    assert_eq!(item.likes, 0);
    assert!(backend.lock().unwrap().actions.is_empty());
}

#[tokio::test]
async fn test_search_through_backend() {
    let (url, _backend) = spawn_backend(FakeBackend {
        catalog: sample_catalog(),
        ..Default::default()
    })
    .await;
    let client = create_client(&url, 5).await;

    let results = search_titles(&client, "the thing").await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].catalog_id, CatalogId(106));

    let too_short = search_titles(&client, "al").await.unwrap();
    assert!(too_short.is_empty());
}
