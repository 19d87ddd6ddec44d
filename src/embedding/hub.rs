use crate::config::ModelType;
use crate::error::{MovieSearchError, Result};
use hf_hub::api::tokio::{Api, ApiBuilder, ApiRepo};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default HuggingFace Hub endpoint
const DEFAULT_HF_ENDPOINT: &str = "https://huggingface.co";

const REQUIRED_FILES: [&str; 3] = ["config.json", "model.safetensors", "tokenizer.json"];

/// Paths to the required model files
pub struct ModelFiles {
    /// Path to config.json
    pub config: PathBuf,
    /// Path to model.safetensors
    pub weights: PathBuf,
    /// Path to tokenizer.json
    pub tokenizer: PathBuf,
}

/// HuggingFace Hub client for downloading embedding models.
///
/// Honors `HF_ENDPOINT` (mirror support), `HF_HOME` (cache directory) and
/// `HF_TOKEN` (private models) from the environment.
pub struct ModelHub {
    api: Api,
}

impl ModelHub {
    pub fn new() -> Result<Self> {
        let endpoint =
            std::env::var("HF_ENDPOINT").unwrap_or_else(|_| DEFAULT_HF_ENDPOINT.to_string());

        info!(endpoint = %endpoint, "Initializing HuggingFace Hub API");

        let api = ApiBuilder::from_env()
            .with_endpoint(endpoint)
            .with_progress(true)
            .build()
            .map_err(|e| {
                MovieSearchError::ModelDownload(format!(
                    "Failed to initialize HuggingFace Hub API: {}",
                    e
                ))
            })?;
        Ok(Self { api })
    }

    /// Download (or retrieve from cache) all required model files
    pub fn get_model_files(&self, model_type: &ModelType) -> Result<ModelFiles> {
        let repo_id = model_type.hf_repo_id();
        let repo = self.api.model(repo_id.to_string());

        info!(
            model = %model_type.display_name(),
            repo = %repo_id,
            "Resolving model files from HuggingFace Hub"
        );

        let config = self.get_file(&repo, "config.json", model_type)?;
        let weights = self.get_file(&repo, "model.safetensors", model_type)?;
        let tokenizer = self.get_file(&repo, "tokenizer.json", model_type)?;

        Ok(ModelFiles {
            config,
            weights,
            tokenizer,
        })
    }

    /// Check if all required model files are already cached
    pub fn is_cached(model_type: &ModelType) -> bool {
        let cache = hf_hub::Cache::default();
        let cache_repo = cache.model(model_type.hf_repo_id().to_string());
        REQUIRED_FILES.iter().all(|f| cache_repo.get(f).is_some())
    }

    fn get_file(&self, repo: &ApiRepo, filename: &str, model_type: &ModelType) -> Result<PathBuf> {
        debug!(file = %filename, "Fetching model file");
        let fetch_result = if let Ok(handle) = tokio::runtime::Handle::try_current() {
            tokio::task::block_in_place(|| handle.block_on(repo.get(filename)))
        } else {
            let runtime = tokio::runtime::Runtime::new().map_err(|e| {
                MovieSearchError::ModelDownload(format!(
                    "Failed to create Tokio runtime for model download: {}",
                    e
                ))
            })?;
            runtime.block_on(repo.get(filename))
        };

        fetch_result.map_err(|e| {
            MovieSearchError::ModelDownload(format!(
                "Failed to download '{}' for {}: {}\n\
                 Ensure you have internet access or the model is already cached: {}",
                filename,
                model_type.display_name(),
                e,
                model_type.huggingface_url(),
            ))
        })
    }
}

/// Resolve model files with fallback: custom paths > local directory > hf-hub download
///
/// Priority:
/// 1. Custom directory provided via CLI/config (`--model` / `--tokenizer`)
/// 2. Default local directory (`models/...`) with all files present
/// 3. Download from HuggingFace Hub (cached in `~/.cache/huggingface/`)
pub fn resolve_model_files(
    model_type: &ModelType,
    custom_model_path: Option<&Path>,
    custom_tokenizer_path: Option<&Path>,
) -> Result<ModelFiles> {
    if let Some(model_dir) = custom_model_path {
        let tokenizer = match custom_tokenizer_path {
            Some(tp) => tp.to_path_buf(),
            None => model_dir.join("tokenizer.json"),
        };
        info!(path = %model_dir.display(), "Using custom model path");
        return Ok(ModelFiles {
            config: model_dir.join("config.json"),
            weights: model_dir.join("model.safetensors"),
            tokenizer,
        });
    }

    let default_path = model_type.default_model_path();
    let has_local = REQUIRED_FILES.iter().all(|f| default_path.join(f).exists());

    if has_local {
        info!(path = %default_path.display(), "Using local model files");
        return Ok(ModelFiles {
            config: default_path.join("config.json"),
            weights: default_path.join("model.safetensors"),
            tokenizer: model_type.default_tokenizer_path(),
        });
    }

    if ModelHub::is_cached(model_type) {
        info!("Model found in HuggingFace cache");
    } else {
        println!(
            "Model '{}' not found locally. Downloading from HuggingFace Hub...",
            model_type.display_name()
        );
    }

    let hub = ModelHub::new()?;
    hub.get_model_files(model_type)
}
