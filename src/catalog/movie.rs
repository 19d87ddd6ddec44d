use serde::{Deserialize, Serialize};

/// Catalog movie record, immutable after ingestion.
///
/// `votes` and `gross` are display strings from the source dataset
/// ("1.2M", "$28.34M") and are stored unparsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    /// Assigned by the store on insert; unique and stable.
    pub id: Option<i64>,
    pub name: String,
    /// 0-10 scale, absent when the source had no rating.
    pub rating: Option<f64>,
    /// Runtime in minutes.
    pub runtime: Option<i64>,
    /// Comma-joined tag list, e.g. "Action, Crime, Drama".
    pub genre: Option<String>,
    /// 0-100 scale.
    pub metascore: Option<f64>,
    pub plot: Option<String>,
    pub directors: Option<String>,
    pub stars: Option<String>,
    pub votes: Option<String>,
    pub gross: Option<String>,
    pub poster_url: Option<String>,
}

impl Movie {
    /// Text used for the plot embedding. Movies without a plot embed as the
    /// empty string, which the embedder maps to a zero vector.
    pub fn embedding_text(&self) -> &str {
        self.plot.as_deref().unwrap_or("")
    }

    /// Split the comma-joined genre field into trimmed, non-empty tags.
    pub fn genre_tags(&self) -> Vec<&str> {
        split_tags(self.genre.as_deref().unwrap_or(""))
    }
}

/// Split a comma-joined tag field into trimmed, non-empty entries.
pub fn split_tags(field: &str) -> Vec<&str> {
    field
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(genre: Option<&str>, plot: Option<&str>) -> Movie {
        Movie {
            id: None,
            name: "Test".to_string(),
            rating: None,
            runtime: None,
            genre: genre.map(String::from),
            metascore: None,
            plot: plot.map(String::from),
            directors: None,
            stars: None,
            votes: None,
            gross: None,
            poster_url: None,
        }
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("Action, Crime, Drama"), vec!["Action", "Crime", "Drama"]);
        assert_eq!(split_tags(" Drama "), vec!["Drama"]);
        assert_eq!(split_tags("Drama,,"), vec!["Drama"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_genre_tags_absent_field() {
        assert!(movie(None, None).genre_tags().is_empty());
        assert_eq!(movie(Some("Sci-Fi"), None).genre_tags(), vec!["Sci-Fi"]);
    }

    #[test]
    fn test_embedding_text_missing_plot() {
        assert_eq!(movie(None, None).embedding_text(), "");
        assert_eq!(movie(None, Some("A heist.")).embedding_text(), "A heist.");
    }
}
