use crate::catalog::Movie;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::search::{validate_limit, validate_query};
use crate::storage::{MovieStore, VectorStore};
use serde::Serialize;

pub const MSG_EXACT: &str = "Movies found matching your query";
pub const MSG_SIMILAR: &str = "No exact matches found, but here are some similar movies";
pub const MSG_NONE: &str = "No movies found";
pub const MSG_NONE_FILTERED: &str = "No movies found matching your criteria";

/// A movie plus its similarity to the query. `similarity` is `None` when
/// ranking did not run (structural-only search).
#[derive(Debug, Clone, Serialize)]
pub struct RankedMovie {
    #[serde(flatten)]
    pub movie: Movie,
    pub similarity: Option<f32>,
}

/// Semantic/hybrid response. No total is reported: ranking the full
/// (filtered) corpus just to count it is deliberately not part of this
/// contract, unlike structural search.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticResponse {
    pub results: Vec<RankedMovie>,
    pub exact_matches: bool,
    pub message: String,
}

pub struct SemanticSearch<'a> {
    store: &'a MovieStore,
    vectors: &'a VectorStore,
    threshold: f32,
}

impl<'a> SemanticSearch<'a> {
    pub fn new(store: &'a MovieStore, vectors: &'a VectorStore, threshold: f32) -> Self {
        Self {
            store,
            vectors,
            threshold,
        }
    }

    /// Rank the whole embedded catalog against a natural-language query.
    /// Movies without an embedding never appear in the results.
    pub fn search(&self, embedder: &Embedder, query: &str, limit: usize) -> Result<SemanticResponse> {
        validate_query(query)?;
        validate_limit(limit)?;

        let query_embedding = embedder.embed_query(query)?;
        self.search_with_embedding(&query_embedding, limit)
    }

    /// Ranking path with a precomputed query embedding
    pub fn search_with_embedding(
        &self,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<SemanticResponse> {
        validate_limit(limit)?;
        let ranked = self.vectors.search_similar(query_embedding, limit)?;
        assemble_response(self.store, ranked, self.threshold, false)
    }
}

/// Hydrate ranked ids into a response, applying the threshold classification
/// and message policy. The exact-match flag is decided over the returned
/// top-`limit` set only, on the rounded (reported) scores.
pub(crate) fn assemble_response(
    store: &MovieStore,
    ranked: Vec<(i64, f32)>,
    threshold: f32,
    filtered: bool,
) -> Result<SemanticResponse> {
    let mut results = Vec::with_capacity(ranked.len());
    for (id, score) in ranked {
        if let Some(movie) = store.get_movie(id)? {
            results.push(RankedMovie {
                movie,
                similarity: Some(round_score(score)),
            });
        }
    }

    let exact_matches = results
        .iter()
        .any(|r| r.similarity.is_some_and(|s| s >= threshold));

    let message = select_message(exact_matches, results.len(), filtered).to_string();

    Ok(SemanticResponse {
        results,
        exact_matches,
        message,
    })
}

/// Reported similarity is rounded to 4 decimal places
pub(crate) fn round_score(score: f32) -> f32 {
    (score * 10_000.0).round() / 10_000.0
}

pub(crate) fn select_message(exact_matches: bool, result_count: usize, filtered: bool) -> &'static str {
    if exact_matches {
        MSG_EXACT
    } else if result_count > 0 {
        MSG_SIMILAR
    } else if filtered {
        MSG_NONE_FILTERED
    } else {
        MSG_NONE
    }
}
