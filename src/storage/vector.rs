use crate::error::{MovieSearchError, Result};
use rusqlite::Connection;

pub struct VectorStore {
    conn: Connection,
}

/// Register the sqlite-vec extension for every connection opened afterwards.
/// Must run before any `vec0` table is created or queried.
pub fn register_vector_extension() {
    unsafe {
        use rusqlite::ffi::sqlite3_auto_extension;
        sqlite3_auto_extension(Some(std::mem::transmute::<
            *const (),
            unsafe extern "C" fn(
                *mut rusqlite::ffi::sqlite3,
                *mut *mut std::os::raw::c_char,
                *const rusqlite::ffi::sqlite3_api_routines,
            ) -> std::os::raw::c_int,
        >(sqlite_vec::sqlite3_vec_init as *const ())));
    }
}

impl VectorStore {
    /// Create a new vector store over its own connection to the catalog DB
    pub fn new(conn: Connection) -> Result<Self> {
        Ok(Self { conn })
    }

    /// Reinitialize the embeddings table (drop and recreate) - used for full rebuilds
    pub fn reinitialize(&self, dimension: usize) -> Result<()> {
        use tracing::{debug, info};

        match self.conn.execute("DROP TABLE IF EXISTS plot_embeddings", []) {
            Ok(_) => info!("Dropped plot_embeddings table"),
            Err(e) => debug!("Could not drop plot_embeddings table: {}", e),
        }

        self.create_table(dimension)?;
        info!(dimension, "Created fresh plot_embeddings table");

        Ok(())
    }

    /// Ensure the embeddings table exists (create if not, keep data if it does)
    pub fn ensure_table(&self, dimension: usize) -> Result<()> {
        self.create_table(dimension)
    }

    fn create_table(&self, dimension: usize) -> Result<()> {
        self.conn.execute(
            &format!(
                "CREATE VIRTUAL TABLE IF NOT EXISTS plot_embeddings USING vec0(
                        movie_id INTEGER PRIMARY KEY,
                        embedding FLOAT[{}]
                    )",
                dimension
            ),
            [],
        )?;
        Ok(())
    }

    /// Movie ids that already have an embedding
    pub fn embedded_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT movie_id FROM plot_embeddings")
            .map_err(|e| {
                MovieSearchError::Storage(format!("Failed to query plot_embeddings: {}", e))
            })?;

        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;

        Ok(ids)
    }

    /// Insert or update the plot embedding for a movie
    pub fn insert_embedding(&self, movie_id: i64, embedding: &[f32]) -> Result<()> {
        let embedding_json = serde_json::to_string(embedding).map_err(|e| {
            MovieSearchError::Storage(format!("Failed to serialize embedding: {}", e))
        })?;

        self.conn.execute(
            "INSERT OR REPLACE INTO plot_embeddings (movie_id, embedding) VALUES (?, ?)",
            rusqlite::params![movie_id, embedding_json],
        )?;

        Ok(())
    }

    /// Store a batch of embeddings, pairing ids with vectors by position.
    /// Returns the number of vectors actually indexed.
    ///
    /// All-zero vectors (blank plots) are never indexed: the distance to
    /// cosine conversion assumes unit vectors, and a zero vector sits at
    /// distance 1 from every unit query, which would read back as a constant
    /// 0.5 similarity. Movies without an index row stay out of the ranking.
    pub fn insert_embeddings(&self, ids: &[i64], embeddings: &[Vec<f32>]) -> Result<usize> {
        let mut stored = 0;
        for (id, embedding) in ids.iter().zip(embeddings) {
            if is_zero(embedding) {
                continue;
            }
            self.insert_embedding(*id, embedding)?;
            stored += 1;
        }
        Ok(stored)
    }

    /// KNN search over all embedded movies.
    ///
    /// Returns `(movie_id, cosine_similarity)` ordered by similarity
    /// descending, ties broken by ascending id.
    pub fn search_similar(&self, query_embedding: &[f32], top_k: usize) -> Result<Vec<(i64, f32)>> {
        let embedding_json = serde_json::to_string(query_embedding).map_err(|e| {
            MovieSearchError::Storage(format!("Failed to serialize query embedding: {}", e))
        })?;

        let mut stmt = self.conn.prepare(
            "SELECT movie_id, distance
                 FROM plot_embeddings
                 WHERE embedding MATCH ?
                 ORDER BY distance
                 LIMIT ?",
        )?;

        let mut results: Vec<(i64, f32)> = stmt
            .query_map(rusqlite::params![embedding_json, top_k as i64], |row| {
                let movie_id: i64 = row.get(0)?;
                let dist: f64 = row.get(1)?;
                Ok((movie_id, l2_to_cosine(dist as f32)))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        sort_ranked(&mut results);
        Ok(results)
    }

    /// KNN search restricted to pre-filtered candidate ids.
    ///
    /// A candidate's rank in the nearest-neighbor stream is unrelated to the
    /// filter, so the scan covers every embedded row; any shorter window can
    /// drop candidates whose vectors rank below it.
    pub fn search_similar_filtered(
        &self,
        query_embedding: &[f32],
        candidate_ids: &[i64],
        top_k: usize,
    ) -> Result<Vec<(i64, f32)>> {
        use std::collections::HashSet;

        let candidate_set: HashSet<i64> = candidate_ids.iter().copied().collect();
        let scan_limit = self.embedded_count()?;
        if scan_limit == 0 {
            return Ok(Vec::new());
        }

        let embedding_json = serde_json::to_string(query_embedding).map_err(|e| {
            MovieSearchError::Storage(format!("Failed to serialize query embedding: {}", e))
        })?;

        let mut stmt = self.conn.prepare(
            "SELECT movie_id, distance
                 FROM plot_embeddings
                 WHERE embedding MATCH ?
                 ORDER BY distance
                 LIMIT ?",
        )?;

        let mut results: Vec<(i64, f32)> = stmt
            .query_map(
                rusqlite::params![embedding_json, scan_limit as i64],
                |row| {
                    let movie_id: i64 = row.get(0)?;
                    let dist: f64 = row.get(1)?;
                    Ok((movie_id, l2_to_cosine(dist as f32)))
                },
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|(movie_id, _)| candidate_set.contains(movie_id))
            .collect();

        sort_ranked(&mut results);
        results.truncate(top_k);

        Ok(results)
    }

    fn embedded_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM plot_embeddings", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn is_zero(vector: &[f32]) -> bool {
    vector.iter().all(|&v| v == 0.0)
}

/// Convert L2 distance between normalized vectors to cosine similarity:
/// `L2² = 2·(1 − cos)`, so `cos = 1 − L2²/2`. Clamped to [0, 1].
fn l2_to_cosine(dist: f32) -> f32 {
    (1.0 - dist * dist / 2.0).clamp(0.0, 1.0)
}

/// Similarity descending, id ascending on ties — keeps pagination stable
/// where the raw nearest-neighbor stream makes no ordering promise.
fn sort_ranked(results: &mut [(i64, f32)]) {
    results.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
}
