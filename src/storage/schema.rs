use crate::error::Result;
use rusqlite::Connection;

pub const SCHEMA_VERSION: i32 = 1;

pub struct Schema;

impl Schema {
    /// Initialize database schema
    pub fn initialize(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS movies (
                id         INTEGER PRIMARY KEY,
                name       TEXT NOT NULL,
                rating     REAL,
                runtime    INTEGER,
                genre      TEXT,
                metascore  REAL,
                plot       TEXT,
                directors  TEXT,
                stars      TEXT,
                votes      TEXT,
                gross      TEXT,
                poster_url TEXT
            )",
            [],
        )?;

        // Indexes for common filter/sort columns
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_movies_name ON movies(name)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_movies_rating ON movies(rating)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_movies_runtime ON movies(runtime)",
            [],
        )?;

        // Metadata table for schema/model version tracking
        conn.execute(
            "CREATE TABLE IF NOT EXISTS metadata (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)",
            [SCHEMA_VERSION.to_string()],
        )?;

        Ok(())
    }

    /// Get current schema version
    #[allow(dead_code)]
    pub fn get_version(conn: &Connection) -> Result<i32> {
        let version: String = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .unwrap_or_else(|_| "0".to_string());
        Ok(version.parse().unwrap_or(0))
    }

    /// Record which embedding model the stored vectors were built with
    pub fn set_embedding_model(conn: &Connection, model_id: &str) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES ('embedding_model', ?)",
            [model_id],
        )?;
        Ok(())
    }

    /// Embedding model the stored vectors were built with, if any
    pub fn get_embedding_model(conn: &Connection) -> Result<Option<String>> {
        use rusqlite::OptionalExtension;
        let model = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'embedding_model'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(model)
    }
}
