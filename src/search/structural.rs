use crate::catalog::{split_tags, Movie};
use crate::error::{MovieSearchError, Result};
use crate::search::validate_limit;
use crate::storage::MovieStore;
use serde::{Deserialize, Serialize};

/// Sort key for structural search. Explicit enum-to-column dispatch, so an
/// unknown field can never reach the SQL layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Rating,
    Runtime,
    Name,
    Metascore,
}

impl SortBy {
    pub fn column(&self) -> &'static str {
        match self {
            SortBy::Rating => "rating",
            SortBy::Runtime => "runtime",
            SortBy::Name => "name",
            SortBy::Metascore => "metascore",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Structural filter set. Every field is independently optional; present
/// fields AND together. Substring fields match case-insensitively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieFilters {
    pub name: Option<String>,
    pub genre: Option<String>,
    pub directors: Option<String>,
    pub stars: Option<String>,
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub min_runtime: Option<i64>,
    pub max_runtime: Option<i64>,
}

impl MovieFilters {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.genre.is_none()
            && self.directors.is_none()
            && self.stars.is_none()
            && self.min_rating.is_none()
            && self.max_rating.is_none()
            && self.min_runtime.is_none()
            && self.max_runtime.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        for (label, value) in [("min_rating", self.min_rating), ("max_rating", self.max_rating)] {
            if let Some(rating) = value {
                if !(0.0..=10.0).contains(&rating) {
                    return Err(MovieSearchError::InvalidArgument(format!(
                        "{} must be between 0 and 10",
                        label
                    )));
                }
            }
        }
        for (label, value) in [
            ("min_runtime", self.min_runtime),
            ("max_runtime", self.max_runtime),
        ] {
            if let Some(runtime) = value {
                if runtime < 0 {
                    return Err(MovieSearchError::InvalidArgument(format!(
                        "{} must be non-negative",
                        label
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuralRequest {
    pub filters: MovieFilters,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub skip: usize,
    pub limit: usize,
}

impl Default for StructuralRequest {
    fn default() -> Self {
        Self {
            filters: MovieFilters::default(),
            sort_by: SortBy::default(),
            sort_order: SortOrder::default(),
            skip: 0,
            limit: 10,
        }
    }
}

/// Paginated structural search response
#[derive(Debug, Clone, Serialize)]
pub struct StructuralResponse {
    pub results: Vec<Movie>,
    /// Matches before pagination
    pub total: usize,
    pub skip: usize,
    pub limit: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreCount {
    pub name: String,
    pub count: usize,
}

/// Rating/runtime bounds for the filter UI. Defaults cover the empty
/// catalog so sliders always get a valid range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub min_rating: f64,
    pub max_rating: f64,
    pub min_runtime: i64,
    pub max_runtime: i64,
    pub total_movies: usize,
}

impl Default for CatalogStats {
    fn default() -> Self {
        Self {
            min_rating: 0.0,
            max_rating: 10.0,
            min_runtime: 0,
            max_runtime: 300,
            total_movies: 0,
        }
    }
}

pub struct StructuralSearch<'a> {
    store: &'a MovieStore,
}

impl<'a> StructuralSearch<'a> {
    pub fn new(store: &'a MovieStore) -> Self {
        Self { store }
    }

    /// Filter, sort, and paginate the catalog. `total` counts all matches
    /// regardless of pagination; skip past the end yields an empty page.
    pub fn search(&self, request: &StructuralRequest) -> Result<StructuralResponse> {
        validate_limit(request.limit)?;
        request.filters.validate()?;

        let (results, total) = self.store.filter_and_count(
            &request.filters,
            request.sort_by,
            request.sort_order,
            request.skip,
            request.limit,
        )?;

        let has_more = request.skip + results.len() < total;

        Ok(StructuralResponse {
            results,
            total,
            skip: request.skip,
            limit: request.limit,
            has_more,
        })
    }

    /// Unique genre tags with movie counts, most frequent first
    pub fn list_genres(&self) -> Result<Vec<GenreCount>> {
        use std::collections::HashMap;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for row in self.store.genre_rows()? {
            for tag in split_tags(&row) {
                *counts.entry(tag.to_string()).or_insert(0) += 1;
            }
        }

        let mut genres: Vec<GenreCount> = counts
            .into_iter()
            .map(|(name, count)| GenreCount { name, count })
            .collect();
        // Count descending, name ascending on ties for a stable listing
        genres.sort_by(|a, b| b.count.cmp(&a.count).then(a.name.cmp(&b.name)));

        Ok(genres)
    }

    /// Catalog aggregates for the filter UI
    pub fn get_stats(&self) -> Result<CatalogStats> {
        let row = self.store.stats_row()?;
        let defaults = CatalogStats::default();

        Ok(CatalogStats {
            min_rating: row.min_rating.unwrap_or(defaults.min_rating),
            max_rating: row.max_rating.unwrap_or(defaults.max_rating),
            min_runtime: row.min_runtime.unwrap_or(defaults.min_runtime),
            max_runtime: row.max_runtime.unwrap_or(defaults.max_runtime),
            total_movies: row.total_movies as usize,
        })
    }
}
