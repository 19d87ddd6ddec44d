use thiserror::Error;

#[derive(Error, Debug)]
pub enum MovieSearchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Model loading error: {0}")]
    ModelLoad(String),

    #[error("Model download error: {0}")]
    ModelDownload(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, MovieSearchError>;
