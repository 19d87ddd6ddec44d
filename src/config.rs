use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Embedding vector dimension (all-MiniLM-L6-v2 and multilingual-e5-small both emit 384).
/// A policy/model choice, not derived — change it together with the encoder.
pub const EMBEDDING_DIM: usize = 384;

/// Minimum cosine similarity for a semantic result to count as an "exact" match.
pub const SIMILARITY_THRESHOLD: f32 = 0.6;

/// Embedding model type
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ModelType {
    /// all-MiniLM-L6-v2 (English, 384 dim, fast)
    #[default]
    Minilm,
    /// multilingual-e5-small (100 languages, 384 dim, requires prefix)
    E5Multilingual,
}

impl ModelType {
    /// Default model directory path
    pub fn default_model_path(&self) -> PathBuf {
        match self {
            ModelType::Minilm => PathBuf::from("models/all-MiniLM-L6-v2"),
            ModelType::E5Multilingual => PathBuf::from("models/multilingual-e5-small"),
        }
    }

    /// Default tokenizer file path
    pub fn default_tokenizer_path(&self) -> PathBuf {
        self.default_model_path().join("tokenizer.json")
    }

    /// Model display name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelType::Minilm => "all-MiniLM-L6-v2",
            ModelType::E5Multilingual => "multilingual-e5-small",
        }
    }

    /// HuggingFace repository id for model download
    pub fn hf_repo_id(&self) -> &'static str {
        match self {
            ModelType::Minilm => "sentence-transformers/all-MiniLM-L6-v2",
            ModelType::E5Multilingual => "intfloat/multilingual-e5-small",
        }
    }

    /// HuggingFace model URL for download instructions
    pub fn huggingface_url(&self) -> &'static str {
        match self {
            ModelType::Minilm => "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2",
            ModelType::E5Multilingual => "https://huggingface.co/intfloat/multilingual-e5-small",
        }
    }

    /// Whether this model requires query/passage prefix
    pub fn requires_prefix(&self) -> bool {
        match self {
            ModelType::Minilm => false,
            ModelType::E5Multilingual => true,
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Database file path
    pub db_path: PathBuf,

    /// Embedding model type
    pub model_type: ModelType,

    /// Custom model directory (overrides local default and hub download)
    pub model_path: Option<PathBuf>,

    /// Custom tokenizer file (overrides the model directory's tokenizer.json)
    pub tokenizer_path: Option<PathBuf>,

    /// Vector dimension
    pub embedding_dim: usize,

    /// Batch size for embedding generation
    pub batch_size: usize,

    /// Minimum similarity for "exact match" classification
    pub similarity_threshold: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("movie_search.db"),
            model_path: None,
            tokenizer_path: None,
            model_type: ModelType::default(),
            embedding_dim: EMBEDDING_DIM,
            batch_size: 32,
            similarity_threshold: SIMILARITY_THRESHOLD,
        }
    }
}

impl Config {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            ..Default::default()
        }
    }

    /// Create config with a specific model type
    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tokenizer_lives_in_model_dir() {
        for model_type in [ModelType::Minilm, ModelType::E5Multilingual] {
            assert_eq!(
                model_type.default_tokenizer_path(),
                model_type.default_model_path().join("tokenizer.json")
            );
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::new(PathBuf::from("catalog.db"));
        assert_eq!(config.db_path, PathBuf::from("catalog.db"));
        assert_eq!(config.model_type, ModelType::Minilm);
        assert_eq!(config.embedding_dim, EMBEDDING_DIM);
        assert_eq!(config.similarity_threshold, SIMILARITY_THRESHOLD);
    }
}
