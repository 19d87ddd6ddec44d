use crate::catalog::Movie;
use crate::error::{MovieSearchError, Result};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::warn;

/// Reader for the processed IMDb-style catalog CSV.
///
/// Headers are normalized to lowercase snake_case before matching, so
/// "Movie Name" and "movie_name" are equivalent. Only `movie_name` is
/// required; every other column is nullable. Numeric fields that fail to
/// parse become NULL rather than failing the row.
pub struct CsvCatalogReader;

impl CsvCatalogReader {
    pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Vec<Movie>> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::read(file)
    }

    pub fn read<R: Read>(input: R) -> Result<Vec<Movie>> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);

        let headers = reader.headers()?.clone();
        let index = HeaderIndex::resolve(&headers)?;

        let mut movies = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            match index.to_movie(&record) {
                Some(movie) => movies.push(movie),
                None => warn!(row = row + 2, "Skipping row without a movie name"),
            }
        }

        Ok(movies)
    }
}

/// Column positions after header normalization
struct HeaderIndex {
    name: usize,
    rating: Option<usize>,
    runtime: Option<usize>,
    genre: Option<usize>,
    metascore: Option<usize>,
    plot: Option<usize>,
    directors: Option<usize>,
    stars: Option<usize>,
    votes: Option<usize>,
    gross: Option<usize>,
    poster_url: Option<usize>,
}

impl HeaderIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |name: &str| normalized.iter().position(|h| h == name);

        let name = find("movie_name").or_else(|| find("name")).ok_or_else(|| {
            MovieSearchError::InvalidArgument(
                "CSV must contain a 'movie_name' column".to_string(),
            )
        })?;

        Ok(Self {
            name,
            rating: find("rating"),
            runtime: find("runtime"),
            genre: find("genre"),
            metascore: find("metascore"),
            plot: find("plot"),
            directors: find("directors"),
            stars: find("stars"),
            votes: find("votes"),
            gross: find("gross"),
            poster_url: find("poster_url"),
        })
    }

    fn to_movie(&self, record: &StringRecord) -> Option<Movie> {
        let name = text_field(record, Some(self.name))?;

        Some(Movie {
            id: None,
            name,
            rating: number_field(record, self.rating),
            runtime: integer_field(record, self.runtime),
            genre: text_field(record, self.genre),
            metascore: number_field(record, self.metascore),
            plot: text_field(record, self.plot),
            directors: text_field(record, self.directors),
            stars: text_field(record, self.stars),
            votes: text_field(record, self.votes),
            gross: text_field(record, self.gross),
            poster_url: text_field(record, self.poster_url),
        })
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

fn raw_field<'a>(record: &'a StringRecord, index: Option<usize>) -> Option<&'a str> {
    let value = record.get(index?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn text_field(record: &StringRecord, index: Option<usize>) -> Option<String> {
    raw_field(record, index).map(String::from)
}

fn number_field(record: &StringRecord, index: Option<usize>) -> Option<f64> {
    raw_field(record, index).and_then(|v| v.parse().ok())
}

/// Parse an integer field, tolerating unit suffixes like "142 min"
fn integer_field(record: &StringRecord, index: Option<usize>) -> Option<i64> {
    let value = raw_field(record, index)?;
    let digits: String = value.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_basic_catalog() {
        let data = "\
movie_name,rating,runtime,genre,plot
The Shawshank Redemption,9.3,142,Drama,Two imprisoned men bond over a number of years
The Godfather,9.2,175,\"Crime, Drama\",The aging patriarch hands control to his son
";
        let movies = CsvCatalogReader::read(data.as_bytes()).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].name, "The Shawshank Redemption");
        assert_eq!(movies[0].rating, Some(9.3));
        assert_eq!(movies[0].runtime, Some(142));
        assert_eq!(movies[1].genre.as_deref(), Some("Crime, Drama"));
        assert!(movies[0].metascore.is_none());
    }

    #[test]
    fn test_headers_are_normalized() {
        let data = "Movie Name,Rating\nInception,8.8\n";
        let movies = CsvCatalogReader::read(data.as_bytes()).unwrap();
        assert_eq!(movies[0].name, "Inception");
        assert_eq!(movies[0].rating, Some(8.8));
    }

    #[test]
    fn test_missing_name_column_is_an_error() {
        let data = "rating,runtime\n9.0,120\n";
        assert!(matches!(
            CsvCatalogReader::read(data.as_bytes()),
            Err(MovieSearchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unparseable_numbers_become_null() {
        let data = "movie_name,rating,runtime\nWeird,not-a-number,N/A\n";
        let movies = CsvCatalogReader::read(data.as_bytes()).unwrap();
        assert_eq!(movies[0].rating, None);
        assert_eq!(movies[0].runtime, None);
    }

    #[test]
    fn test_runtime_unit_suffix_tolerated() {
        let data = "movie_name,runtime\nLong One,175 min\n";
        let movies = CsvCatalogReader::read(data.as_bytes()).unwrap();
        assert_eq!(movies[0].runtime, Some(175));
    }

    #[test]
    fn test_rows_without_name_are_skipped() {
        let data = "movie_name,rating\nKept,9.0\n,8.0\n";
        let movies = CsvCatalogReader::read(data.as_bytes()).unwrap();
        assert_eq!(movies.len(), 1);
        assert_eq!(movies[0].name, "Kept");
    }
}
