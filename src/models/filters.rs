use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const MAX_RATING: f32 = 10.0;

/// User-selected narrowing applied to feed queries
///
/// Compared structurally after [`FilterCriteria::normalized`], so two values
/// built from the same selections are equal even if they are distinct objects.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rating: Option<f32>,
}

impl FilterCriteria {
    pub fn with_genres<I, S>(genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            genres: genres.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Canonical form used for comparison and for the wire
    ///
    /// Genres are trimmed, sorted and deduplicated, and the "all" pseudo-genre
    /// is dropped. A bare year date such as `1999` becomes `01/01/1999`.
    pub fn normalized(&self) -> Self {
        let mut genres: Vec<String> = self
            .genres
            .iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("all"))
            .collect();
        genres.sort();
        genres.dedup();

        Self {
            genres,
            min_release_date: normalize_date(self.min_release_date.as_deref()),
            max_release_date: normalize_date(self.max_release_date.as_deref()),
            min_rating: self.min_rating,
            max_rating: self.max_rating,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        for rating in [self.min_rating, self.max_rating].into_iter().flatten() {
            if !(0.0..=MAX_RATING).contains(&rating) {
                return Err(AppError::InvalidInput(format!(
                    "rating {} outside 0-{}",
                    rating, MAX_RATING
                )));
            }
        }

        if let (Some(min), Some(max)) = (self.min_rating, self.max_rating) {
            if min > max {
                return Err(AppError::InvalidInput(format!(
                    "min_rating {} is greater than max_rating {}",
                    min, max
                )));
            }
        }

        Ok(())
    }

    /// True when no narrowing is applied
    pub fn is_default(&self) -> bool {
        self.normalized() == Self::default()
    }
}

fn normalize_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains('/') {
        Some(raw.to_string())
    } else {
        Some(format!("01/01/{}", raw))
    }
}
