use crate::config::{Config, ModelType};
use crate::embedding::hub::{resolve_model_files, ModelFiles};
use crate::embedding::model::BertEncoder;
use crate::error::{MovieSearchError, Result};
use std::sync::{Mutex, OnceLock};

pub struct Embedder {
    encoder: BertEncoder,
    tokenizer: tokenizers::Tokenizer,
    model_type: ModelType,
    dimension: usize,
}

impl Embedder {
    /// Create a new embedder from resolved model files
    pub fn new(files: &ModelFiles, model_type: ModelType, dimension: usize) -> Result<Self> {
        let encoder = BertEncoder::load(&files.config, &files.weights, &model_type)?;

        if !files.tokenizer.exists() {
            return Err(MovieSearchError::ModelLoad(format!(
                "Tokenizer not found: {}\nDownload from: {}",
                files.tokenizer.display(),
                model_type.huggingface_url(),
            )));
        }
        let tokenizer = tokenizers::Tokenizer::from_file(&files.tokenizer).map_err(|e| {
            MovieSearchError::ModelLoad(format!("Failed to load tokenizer: {}", e))
        })?;

        Ok(Self {
            encoder,
            tokenizer,
            model_type,
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed a single search query (auto-adds "query: " prefix for E5 models)
    pub fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        if is_blank(text) {
            return Ok(zero_vector(self.dimension));
        }
        if self.model_type.requires_prefix() {
            self.embed(&format!("query: {}", text))
        } else {
            self.embed(text)
        }
    }

    /// Embed movie plots in batch (auto-adds "passage: " prefix for E5 models).
    /// Blank plots become zero vectors without touching the model.
    pub fn embed_plots(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        if self.model_type.requires_prefix() {
            let prefixed: Vec<String> = texts
                .iter()
                .map(|t| {
                    if is_blank(t) {
                        t.clone()
                    } else {
                        format!("passage: {}", t)
                    }
                })
                .collect();
            self.embed_batch(&prefixed, batch_size)
        } else {
            self.embed_batch(texts, batch_size)
        }
    }

    /// Embed a single text (raw, no prefix). Blank text maps to the zero vector.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if is_blank(text) {
            return Ok(zero_vector(self.dimension));
        }

        let vectors = self.encode_chunk(&[text])?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| MovieSearchError::Embedding("No embedding generated".to_string()))
    }

    /// Embed multiple texts (raw, no prefix), chunked by `batch_size`.
    ///
    /// Per-index results are identical to calling [`Embedder::embed`] on each
    /// text individually; blank entries resolve to zero vectors.
    pub fn embed_batch(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        embed_with(texts, self.dimension, batch_size, |chunk| {
            self.encode_chunk(chunk)
        })
    }

    fn encode_chunk(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<String> = texts.iter().map(|t| t.to_string()).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| MovieSearchError::Embedding(format!("Tokenization failed: {}", e)))?;

        let token_ids: Vec<Vec<u32>> = encodings.iter().map(|e| e.get_ids().to_vec()).collect();
        let attention_masks: Vec<Vec<u32>> = encodings
            .iter()
            .map(|e| e.get_attention_mask().to_vec())
            .collect();

        self.encoder.encode(&token_ids, &attention_masks)
    }
}

/// Batch plan shared by the embedder and its tests: blank texts map to zero
/// vectors, the rest run through `encode` in `batch_size` chunks, and results
/// land back at their original indices.
fn embed_with<F>(
    texts: &[String],
    dimension: usize,
    batch_size: usize,
    mut encode: F,
) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[&str]) -> Result<Vec<Vec<f32>>>,
{
    let mut out = vec![zero_vector(dimension); texts.len()];

    let live: Vec<usize> = texts
        .iter()
        .enumerate()
        .filter(|(_, t)| !is_blank(t))
        .map(|(i, _)| i)
        .collect();

    for chunk in live.chunks(batch_size.max(1)) {
        let inputs: Vec<&str> = chunk.iter().map(|&i| texts[i].as_str()).collect();
        let vectors = encode(&inputs)?;
        if vectors.len() != inputs.len() {
            return Err(MovieSearchError::Embedding(format!(
                "Encoder returned {} vectors for {} inputs",
                vectors.len(),
                inputs.len()
            )));
        }
        for (&i, v) in chunk.iter().zip(vectors) {
            out[i] = v;
        }
    }

    Ok(out)
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// Process-wide lazily loaded embedder.
///
/// The first caller loads the model under a lock so concurrent first use
/// never double-loads; afterwards the handle is immutable and freely shared.
pub struct SharedEmbedder {
    cell: OnceLock<Embedder>,
    init_lock: Mutex<()>,
}

impl SharedEmbedder {
    pub const fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    pub fn get_or_load(&self, config: &Config) -> Result<&Embedder> {
        if let Some(embedder) = self.cell.get() {
            return Ok(embedder);
        }

        let _guard = self.init_lock.lock().map_err(|_| {
            MovieSearchError::Embedding("Embedder initialization lock poisoned".to_string())
        })?;

        // Another thread may have finished loading while we waited
        if let Some(embedder) = self.cell.get() {
            return Ok(embedder);
        }

        let files = resolve_model_files(
            &config.model_type,
            config.model_path.as_deref(),
            config.tokenizer_path.as_deref(),
        )?;
        let embedder = Embedder::new(&files, config.model_type.clone(), config.embedding_dim)?;

        Ok(self.cell.get_or_init(|| embedder))
    }
}

impl Default for SharedEmbedder {
    fn default() -> Self {
        Self::new()
    }
}
