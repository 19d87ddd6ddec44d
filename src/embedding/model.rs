use crate::config::ModelType;
use crate::error::{MovieSearchError, Result};
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;

fn emb_err(stage: &str, e: impl std::fmt::Display) -> MovieSearchError {
    MovieSearchError::Embedding(format!("{}: {}", stage, e))
}

/// Sentence encoder: BERT forward pass + attention-masked mean pooling
/// + L2 normalization, so downstream cosine math can assume unit vectors.
pub struct BertEncoder {
    model: BertModel,
    device: Device,
}

impl BertEncoder {
    /// Select the best available device (GPU -> CPU fallback)
    fn select_device() -> Device {
        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    tracing::info!("Using CUDA GPU for embeddings");
                    return device;
                }
                Err(e) => {
                    tracing::warn!("CUDA GPU unavailable ({}), falling back to CPU", e);
                }
            }
        }

        #[cfg(feature = "accelerate")]
        {
            tracing::info!("Using CPU with Apple Accelerate framework");
        }
        #[cfg(not(feature = "accelerate"))]
        {
            tracing::info!("Using CPU for embeddings");
        }
        Device::Cpu
    }

    /// Load the encoder from local config.json + model.safetensors files
    pub fn load(config_path: &Path, weights_path: &Path, model_type: &ModelType) -> Result<Self> {
        let device = Self::select_device();

        let config_str = std::fs::read_to_string(config_path).map_err(|e| {
            MovieSearchError::ModelLoad(format!(
                "Failed to read model config from {}: {}\n\n\
                Download the {} model (config.json, model.safetensors, tokenizer.json)\n\
                from {} or let the download command fetch it.",
                config_path.display(),
                e,
                model_type.display_name(),
                model_type.huggingface_url(),
            ))
        })?;
        let config: Config = serde_json::from_str(&config_str).map_err(|e| {
            MovieSearchError::ModelLoad(format!("Failed to parse model config: {}", e))
        })?;

        if !weights_path.exists() {
            return Err(MovieSearchError::ModelLoad(format!(
                "Model weights not found: {}\nDownload from: {}",
                weights_path.display(),
                model_type.huggingface_url(),
            )));
        }
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(
                &[weights_path.to_path_buf()],
                candle_core::DType::F32,
                &device,
            )
            .map_err(|e| {
                MovieSearchError::ModelLoad(format!("Failed to load model weights: {}", e))
            })?
        };

        let model = BertModel::load(vb, &config)
            .map_err(|e| MovieSearchError::ModelLoad(format!("Failed to load BERT model: {}", e)))?;

        Ok(Self { model, device })
    }

    /// Encode a batch of tokenized texts into normalized embedding vectors.
    ///
    /// `token_ids` and `attention_masks` come from the tokenizer
    /// (mask 1 = real token, 0 = padding).
    pub fn encode(
        &self,
        token_ids: &[Vec<u32>],
        attention_masks: &[Vec<u32>],
    ) -> Result<Vec<Vec<f32>>> {
        let batch_size = token_ids.len();
        if batch_size == 0 {
            return Ok(Vec::new());
        }

        // Re-pad to this batch's max real length, trusting the attention
        // mask over any padding the tokenizer already applied.
        let actual_lengths: Vec<usize> = attention_masks
            .iter()
            .map(|mask| mask.iter().filter(|&&x| x != 0).count())
            .collect();
        let max_len = actual_lengths.iter().copied().max().unwrap_or(0);

        let mut padded_ids = Vec::with_capacity(batch_size * max_len);
        let mut mask_data = Vec::with_capacity(batch_size * max_len);
        for (idx, ids) in token_ids.iter().enumerate() {
            let actual_len = actual_lengths[idx];
            for i in 0..max_len {
                if i < actual_len && i < ids.len() {
                    padded_ids.push(ids[i]);
                    mask_data.push(1u32);
                } else {
                    padded_ids.push(0u32); // PAD token
                    mask_data.push(0u32);
                }
            }
        }

        let ids_tensor = Tensor::from_vec(padded_ids, (batch_size, max_len), &self.device)
            .map_err(|e| emb_err("Token tensor", e))?;
        let token_type_ids =
            Tensor::zeros((batch_size, max_len), candle_core::DType::U32, &self.device)
                .map_err(|e| emb_err("Token type tensor", e))?;
        let attention_mask = Tensor::from_vec(mask_data, (batch_size, max_len), &self.device)
            .map_err(|e| emb_err("Attention mask tensor", e))?;

        let hidden = self
            .model
            .forward(&ids_tensor, &token_type_ids, Some(&attention_mask))
            .map_err(|e| emb_err("Model forward", e))?;

        // Masked mean pooling via matmul:
        // mask (batch, 1, seq) @ hidden (batch, seq, dim) -> (batch, 1, dim)
        let mask_f32 = attention_mask
            .to_dtype(candle_core::DType::F32)
            .map_err(|e| emb_err("Mask dtype", e))?;
        let summed = mask_f32
            .unsqueeze(1)
            .map_err(|e| emb_err("Mask unsqueeze", e))?
            .matmul(&hidden)
            .map_err(|e| emb_err("Pooling matmul", e))?
            .squeeze(1)
            .map_err(|e| emb_err("Pooling squeeze", e))?;

        let token_counts = mask_f32
            .sum(1)
            .map_err(|e| emb_err("Token count sum", e))?
            .clamp(1.0f64, f64::MAX)
            .map_err(|e| emb_err("Token count clamp", e))?
            .unsqueeze(1)
            .map_err(|e| emb_err("Token count unsqueeze", e))?;

        let pooled = summed
            .broadcast_div(&token_counts)
            .map_err(|e| emb_err("Mean pooling", e))?;

        // L2 normalize
        let norms = pooled
            .sqr()
            .map_err(|e| emb_err("Norm sqr", e))?
            .sum(1)
            .map_err(|e| emb_err("Norm sum", e))?
            .sqrt()
            .map_err(|e| emb_err("Norm sqrt", e))?
            .clamp(1e-12f64, f64::MAX)
            .map_err(|e| emb_err("Norm clamp", e))?
            .unsqueeze(1)
            .map_err(|e| emb_err("Norm unsqueeze", e))?;

        let normalized = pooled
            .broadcast_div(&norms)
            .map_err(|e| emb_err("Normalization", e))?;

        normalized
            .to_vec2::<f32>()
            .map_err(|e| emb_err("Output conversion", e))
    }
}
