use crate::catalog::Movie;
use crate::config::Config;
use crate::embedding::SharedEmbedder;
use crate::error::Result;
use crate::ingest::CsvCatalogReader;
use crate::search::{
    CatalogStats, GenreCount, HybridSearch, MovieFilters, SemanticResponse, StructuralRequest,
    StructuralResponse, StructuralSearch,
};
use crate::storage::{MovieStore, Schema, VectorStore};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// One facade per process: owns the catalog store and the lazily loaded
/// embedder. Search calls only read, so a shared reference is enough.
pub struct MovieSearchApi {
    config: Config,
    store: MovieStore,
    embedder: SharedEmbedder,
}

impl MovieSearchApi {
    pub fn new(config: Config) -> Result<Self> {
        let store = MovieStore::new(&config.db_path)?;
        Ok(Self {
            config,
            store,
            embedder: SharedEmbedder::new(),
        })
    }

    fn vector_store(&self) -> Result<VectorStore> {
        let conn = Connection::open(&self.config.db_path)?;
        let vectors = VectorStore::new(conn)?;
        vectors.ensure_table(self.config.embedding_dim)?;
        Ok(vectors)
    }

    /// Replace the catalog with the contents of a processed CSV file.
    ///
    /// Existing embeddings are dropped as well: ids are reassigned on
    /// ingest, so stale vectors would rank the wrong movies.
    #[instrument(skip(self, csv_path), fields(path = %csv_path.as_ref().display()))]
    pub fn ingest_csv<P: AsRef<Path>>(&mut self, csv_path: P) -> Result<usize> {
        let movies = CsvCatalogReader::read_path(&csv_path)?;
        info!(movie_count = movies.len(), "Parsed catalog CSV");

        let ids = self.store.replace_catalog(&movies)?;
        self.vector_store()?.reinitialize(self.config.embedding_dim)?;

        debug!(inserted = ids.len(), "Stored movies in database");
        Ok(ids.len())
    }

    /// Build plot embeddings.
    ///
    /// - `rebuild = false` (default): incremental — only movies missing a vector
    /// - `rebuild = true`: drop all vectors and regenerate from scratch
    ///
    /// Blank-plot movies count as missing on every incremental run; they
    /// never reach the model and are never indexed.
    #[instrument(skip(self))]
    pub fn build_embeddings(&self, rebuild: bool) -> Result<usize> {
        use std::collections::HashSet;

        let vectors = self.vector_store()?;

        let pending: Vec<i64> = if rebuild {
            vectors.reinitialize(self.config.embedding_dim)?;
            let ids = self.store.all_ids()?;
            info!(total = ids.len(), "Starting full embedding rebuild");
            ids
        } else {
            let all: HashSet<i64> = self.store.all_ids()?.into_iter().collect();
            let existing: HashSet<i64> = vectors.embedded_ids()?.into_iter().collect();
            let mut missing: Vec<i64> = all.difference(&existing).copied().collect();
            missing.sort_unstable();

            if missing.is_empty() {
                info!("All movies already have embeddings, nothing to do");
                return Ok(0);
            }
            info!(
                total_missing = missing.len(),
                total_existing = existing.len(),
                "Starting incremental embedding generation"
            );
            missing
        };

        self.check_model_consistency()?;

        let embedder = self.embedder.get_or_load(&self.config)?;
        let batch_size = self.config.batch_size;
        let mut count = 0;

        for (batch_idx, chunk) in pending.chunks(batch_size).enumerate() {
            let mut texts = Vec::with_capacity(chunk.len());
            let mut ids = Vec::with_capacity(chunk.len());

            for &movie_id in chunk {
                if let Some(movie) = self.store.get_movie(movie_id)? {
                    texts.push(movie.embedding_text().to_string());
                    ids.push(movie_id);
                }
            }

            let embeddings = embedder.embed_plots(&texts, batch_size)?;
            count += vectors.insert_embeddings(&ids, &embeddings)?;

            debug!(batch = batch_idx + 1, total = count, "Stored embeddings");
        }

        let conn = Connection::open(&self.config.db_path)?;
        Schema::set_embedding_model(&conn, self.config.model_type.hf_repo_id())?;

        info!(total_embeddings = count, "Completed embedding generation");
        Ok(count)
    }

    /// Warn when stored vectors came from a different encoder; mixing models
    /// makes cosine scores meaningless.
    fn check_model_consistency(&self) -> Result<()> {
        let conn = Connection::open(&self.config.db_path)?;
        if let Some(stored) = Schema::get_embedding_model(&conn)? {
            let current = self.config.model_type.hf_repo_id();
            if stored != current {
                warn!(
                    stored = %stored,
                    current = %current,
                    "Embedding model changed; run build-embeddings --rebuild"
                );
            }
        }
        Ok(())
    }

    /// Attribute-filter search with sorting and pagination
    #[instrument(skip(self, request), fields(skip = request.skip, limit = request.limit))]
    pub fn structural_search(&self, request: &StructuralRequest) -> Result<StructuralResponse> {
        let response = StructuralSearch::new(&self.store).search(request)?;
        info!(
            returned = response.results.len(),
            total = response.total,
            "Structural search completed"
        );
        Ok(response)
    }

    /// Natural-language plot search over the embedded catalog
    #[instrument(skip(self, query), fields(query = %query))]
    pub fn semantic_search(&self, query: &str, limit: usize) -> Result<SemanticResponse> {
        let vectors = self.vector_store()?;
        let embedder = self.embedder.get_or_load(&self.config)?;

        let engine =
            crate::search::SemanticSearch::new(&self.store, &vectors, self.config.similarity_threshold);
        let response = engine.search(embedder, query, limit)?;

        info!(
            returned = response.results.len(),
            exact = response.exact_matches,
            "Semantic search completed"
        );
        Ok(response)
    }

    /// Structural pre-filter, then semantic ranking of the surviving subset
    #[instrument(skip(self, query, filters), fields(query = %query))]
    pub fn hybrid_search(
        &self,
        query: &str,
        filters: &MovieFilters,
        limit: usize,
    ) -> Result<SemanticResponse> {
        let vectors = self.vector_store()?;
        let embedder = self.embedder.get_or_load(&self.config)?;

        let engine =
            HybridSearch::new(&self.store, &vectors, self.config.similarity_threshold);
        let response = engine.search(embedder, query, filters, limit)?;

        info!(
            returned = response.results.len(),
            exact = response.exact_matches,
            "Hybrid search completed"
        );
        Ok(response)
    }

    /// Unique genres with movie counts, most frequent first
    pub fn list_genres(&self) -> Result<Vec<GenreCount>> {
        StructuralSearch::new(&self.store).list_genres()
    }

    /// Rating/runtime bounds and totals for the filter UI
    pub fn get_stats(&self) -> Result<CatalogStats> {
        StructuralSearch::new(&self.store).get_stats()
    }

    pub fn movie_count(&self) -> Result<usize> {
        self.store.count_movies()
    }

    pub fn get_movie(&self, id: i64) -> Result<Option<Movie>> {
        self.store.get_movie(id)
    }
}
