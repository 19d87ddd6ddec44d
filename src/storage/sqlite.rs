use crate::catalog::Movie;
use crate::error::Result;
use crate::search::{MovieFilters, SortBy, SortOrder};
use crate::storage::schema::Schema;
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const MOVIE_COLUMNS: &str =
    "id, name, rating, runtime, genre, metascore, plot, directors, stars, votes, gross, poster_url";

pub struct MovieStore {
    conn: Connection,
}

impl MovieStore {
    /// Open (or create) the catalog database
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        Schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// Replace the entire catalog with the given movies in one transaction.
    /// Returns the assigned ids in input order.
    pub fn replace_catalog(&mut self, movies: &[Movie]) -> Result<Vec<i64>> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM movies", [])?;

        let mut ids = Vec::with_capacity(movies.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO movies (name, rating, runtime, genre, metascore, plot,
                                     directors, stars, votes, gross, poster_url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )?;

            for movie in movies {
                stmt.execute(params![
                    movie.name,
                    movie.rating,
                    movie.runtime,
                    movie.genre,
                    movie.metascore,
                    movie.plot,
                    movie.directors,
                    movie.stars,
                    movie.votes,
                    movie.gross,
                    movie.poster_url,
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }

        tx.commit()?;
        Ok(ids)
    }

    /// Get a movie by id
    pub fn get_movie(&self, id: i64) -> Result<Option<Movie>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS))?;

        let movie = stmt.query_row([id], row_to_movie).optional()?;
        Ok(movie)
    }

    /// Get movies by ids, preserving the input order. Unknown ids are skipped.
    pub fn get_movies(&self, ids: &[i64]) -> Result<Vec<Movie>> {
        let mut movies = Vec::with_capacity(ids.len());
        for &id in ids {
            if let Some(movie) = self.get_movie(id)? {
                movies.push(movie);
            }
        }
        Ok(movies)
    }

    /// Filter, count, sort, and paginate in one call.
    ///
    /// The total is counted before pagination, so it is independent of
    /// skip/limit. NULL sort-key values always sort last regardless of
    /// direction; id ascending is the final tie break so pagination is
    /// deterministic.
    pub fn filter_and_count(
        &self,
        filters: &MovieFilters,
        sort_by: SortBy,
        sort_order: SortOrder,
        skip: usize,
        limit: usize,
    ) -> Result<(Vec<Movie>, usize)> {
        let (where_clause, mut bind_values) = build_where(filters);

        let count_sql = format!("SELECT COUNT(*) FROM movies{}", where_clause);
        let total: i64 = {
            let params_ref: Vec<&dyn rusqlite::types::ToSql> = bind_values
                .iter()
                .map(|v| v as &dyn rusqlite::types::ToSql)
                .collect();
            self.conn
                .query_row(&count_sql, params_ref.as_slice(), |row| row.get(0))?
        };

        let column = sort_by.column();
        let page_sql = format!(
            "SELECT {} FROM movies{} ORDER BY {} IS NULL, {} {}, id ASC LIMIT ? OFFSET ?",
            MOVIE_COLUMNS,
            where_clause,
            column,
            column,
            sort_order.sql()
        );

        bind_values.push(Value::Integer(limit as i64));
        bind_values.push(Value::Integer(skip as i64));

        let params_ref: Vec<&dyn rusqlite::types::ToSql> = bind_values
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();

        let mut stmt = self.conn.prepare(&page_sql)?;
        let movies = stmt
            .query_map(params_ref.as_slice(), row_to_movie)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((movies, total as usize))
    }

    /// Ids of all movies matching the filter set (for pre-filtering vector search)
    pub fn filtered_ids(&self, filters: &MovieFilters) -> Result<Vec<i64>> {
        let (where_clause, bind_values) = build_where(filters);
        let sql = format!("SELECT id FROM movies{} ORDER BY id", where_clause);

        let params_ref: Vec<&dyn rusqlite::types::ToSql> = bind_values
            .iter()
            .map(|v| v as &dyn rusqlite::types::ToSql)
            .collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let ids = stmt
            .query_map(params_ref.as_slice(), |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// All movie ids
    pub fn all_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare("SELECT id FROM movies ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Total movie count
    pub fn count_movies(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Raw genre fields of every movie that has one
    pub fn genre_rows(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT genre FROM movies WHERE genre IS NOT NULL")?;
        let rows = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(rows)
    }

    /// Rating/runtime aggregates for the filter UI. All values are None on an
    /// empty catalog; the structural engine applies the documented defaults.
    pub fn stats_row(&self) -> Result<StatsRow> {
        self.conn
            .query_row(
                "SELECT MIN(rating), MAX(rating), MIN(runtime), MAX(runtime), COUNT(id)
                 FROM movies",
                [],
                |row| {
                    Ok(StatsRow {
                        min_rating: row.get(0)?,
                        max_rating: row.get(1)?,
                        min_runtime: row.get(2)?,
                        max_runtime: row.get(3)?,
                        total_movies: row.get(4)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// Borrow the underlying connection (shared with the vector store in tests)
    #[allow(dead_code)]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Raw aggregate row from the movies table, before default substitution
#[derive(Debug, Clone, Copy)]
pub struct StatsRow {
    pub min_rating: Option<f64>,
    pub max_rating: Option<f64>,
    pub min_runtime: Option<i64>,
    pub max_runtime: Option<i64>,
    pub total_movies: i64,
}

fn row_to_movie(row: &rusqlite::Row<'_>) -> std::result::Result<Movie, rusqlite::Error> {
    Ok(Movie {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        rating: row.get(2)?,
        runtime: row.get(3)?,
        genre: row.get(4)?,
        metascore: row.get(5)?,
        plot: row.get(6)?,
        directors: row.get(7)?,
        stars: row.get(8)?,
        votes: row.get(9)?,
        gross: row.get(10)?,
        poster_url: row.get(11)?,
    })
}

/// Build the WHERE clause for a filter set. All present conditions AND
/// together; substring filters are case-insensitive contains matches.
fn build_where(filters: &MovieFilters) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut bind_values = Vec::new();

    if let Some(ref name) = filters.name {
        conditions.push("LOWER(name) LIKE ?");
        bind_values.push(Value::Text(contains_pattern(name)));
    }
    if let Some(ref genre) = filters.genre {
        conditions.push("LOWER(genre) LIKE ?");
        bind_values.push(Value::Text(contains_pattern(genre)));
    }
    if let Some(ref directors) = filters.directors {
        conditions.push("LOWER(directors) LIKE ?");
        bind_values.push(Value::Text(contains_pattern(directors)));
    }
    if let Some(ref stars) = filters.stars {
        conditions.push("LOWER(stars) LIKE ?");
        bind_values.push(Value::Text(contains_pattern(stars)));
    }
    if let Some(min_rating) = filters.min_rating {
        conditions.push("rating >= ?");
        bind_values.push(Value::Real(min_rating));
    }
    if let Some(max_rating) = filters.max_rating {
        conditions.push("rating <= ?");
        bind_values.push(Value::Real(max_rating));
    }
    if let Some(min_runtime) = filters.min_runtime {
        conditions.push("runtime >= ?");
        bind_values.push(Value::Integer(min_runtime));
    }
    if let Some(max_runtime) = filters.max_runtime {
        conditions.push("runtime <= ?");
        bind_values.push(Value::Integer(max_runtime));
    }

    if conditions.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), bind_values)
    }
}

/// Lowercased SQL LIKE contains pattern
fn contains_pattern(needle: &str) -> String {
    format!("%{}%", needle.to_lowercase())
}
