use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::error::AppError;

pub mod exclusion;
pub mod filters;

pub use exclusion::ExclusionSet;
pub use filters::FilterCriteria;

/// External movie-database identifier of a title
///
/// Distinct from the post id: the same catalog entry can be posted more than
/// once, and deduplication happens on this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogId(pub u64);

impl Display for CatalogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display payload of a movie or show
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    #[serde(default)]
    pub tmdb_id: Option<u64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub rating: Option<f32>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub screenplay: Option<String>,
    #[serde(default)]
    pub trailer: Option<String>,
    #[serde(default)]
    pub image_key: Option<String>,
    #[serde(default)]
    pub poster_key: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// A single recommendation shown in the feed
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Item {
    pub item_id: u64,
    pub catalog_id: CatalogId,
    pub entity_type: Option<String>,
    pub entity: Entity,
    pub likes: u32,
    pub comments: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub liked: bool,
    pub seen: bool,
}

impl Item {
    /// Minimal item with an empty payload
    pub fn new(item_id: u64, catalog_id: CatalogId) -> Self {
        Self {
            item_id,
            catalog_id,
            entity_type: None,
            entity: Entity::default(),
            likes: 0,
            comments: 0,
            created_at: None,
            liked: false,
            seen: false,
        }
    }

    pub fn title(&self) -> &str {
        self.entity.title.as_deref().unwrap_or("(untitled)")
    }

    /// Sets the user's like, keeping the like count in step
    pub fn set_liked(&mut self, liked: bool) {
        if self.liked == liked {
            return;
        }
        self.liked = liked;
        self.likes = if liked {
            self.likes.saturating_add(1)
        } else {
            self.likes.saturating_sub(1)
        };
    }
}

// ============================================================================
// Backend API Types
// ============================================================================

/// Raw post as returned by the backend
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiPost {
    #[serde(default)]
    pub post_id: Option<u64>,
    #[serde(default)]
    pub entity_id: Option<u64>,
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity: Option<Entity>,
    #[serde(default)]
    pub likes: Option<u32>,
    #[serde(default)]
    pub comments: Option<u32>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub user_post_info: Option<ApiUserPostInfo>,
}

/// Per-user flags attached to a post
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ApiUserPostInfo {
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub seen: bool,
}

impl TryFrom<ApiPost> for Item {
    type Error = AppError;

    fn try_from(post: ApiPost) -> Result<Self, Self::Error> {
        let item_id = post
            .post_id
            .ok_or_else(|| AppError::Decode("post missing post_id".to_string()))?;

        let entity = post.entity.unwrap_or_default();

        // Prefer the movie-database id on the entity, fall back to the post's entity reference
        let catalog_id = entity
            .tmdb_id
            .or(post.entity_id)
            .map(CatalogId)
            .ok_or_else(|| {
                AppError::Decode(format!("post {} missing catalog id", item_id))
            })?;

        let created_at = post
            .created_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let info = post.user_post_info.unwrap_or_default();

        Ok(Item {
            item_id,
            catalog_id,
            entity_type: post.entity_type,
            entity,
            likes: post.likes.unwrap_or(0),
            comments: post.comments.unwrap_or(0),
            created_at,
            liked: info.liked,
            seen: info.seen,
        })
    }
}
