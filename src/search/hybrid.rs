use crate::embedding::Embedder;
use crate::error::Result;
use crate::search::semantic::{assemble_response, SemanticResponse, MSG_NONE_FILTERED};
use crate::search::{validate_limit, validate_query, MovieFilters};
use crate::storage::{MovieStore, VectorStore};
use tracing::debug;

/// Structural pre-filter followed by semantic ranking of the surviving
/// subset. Filters are a hard gate: a movie outside the predicate can never
/// appear, no matter how similar its plot.
pub struct HybridSearch<'a> {
    store: &'a MovieStore,
    vectors: &'a VectorStore,
    threshold: f32,
}

impl<'a> HybridSearch<'a> {
    pub fn new(store: &'a MovieStore, vectors: &'a VectorStore, threshold: f32) -> Self {
        Self {
            store,
            vectors,
            threshold,
        }
    }

    pub fn search(
        &self,
        embedder: &Embedder,
        query: &str,
        filters: &MovieFilters,
        limit: usize,
    ) -> Result<SemanticResponse> {
        validate_query(query)?;
        validate_limit(limit)?;
        filters.validate()?;

        let query_embedding = embedder.embed_query(query)?;
        self.search_with_embedding(&query_embedding, filters, limit)
    }

    /// Ranking path with a precomputed query embedding
    pub fn search_with_embedding(
        &self,
        query_embedding: &[f32],
        filters: &MovieFilters,
        limit: usize,
    ) -> Result<SemanticResponse> {
        validate_limit(limit)?;
        filters.validate()?;

        let ranked = if filters.is_empty() {
            self.vectors.search_similar(query_embedding, limit)?
        } else {
            let candidates = self.store.filtered_ids(filters)?;
            debug!(candidates = candidates.len(), "Pre-filtered search space");

            if candidates.is_empty() {
                return Ok(SemanticResponse {
                    results: Vec::new(),
                    exact_matches: false,
                    message: MSG_NONE_FILTERED.to_string(),
                });
            }

            self.vectors
                .search_similar_filtered(query_embedding, &candidates, limit)?
        };

        assemble_response(self.store, ranked, self.threshold, true)
    }
}
