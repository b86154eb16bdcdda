//! Sentence embedding for catalog rows and queries.
//!
//! [`SentenceEmbedder`] runs a BERT-architecture sentence-transformers
//! checkpoint through candle with masked mean pooling. [`HashEmbedder`] is a
//! deterministic stand-in for tests and offline work.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use recom_core::config::ModelSettings;
use recom_core::traits::Embedder;
use recom_core::Error;

mod device;
mod fake;
mod pool;
mod tokenize;

pub use device::{select_device, DevicePreference};
pub use fake::HashEmbedder;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_batch;

/// Vector size for a model family: 384 for MiniLM, 768 otherwise.
pub fn vector_size_for_model(model_name: &str) -> usize {
    if model_name.contains("MiniLM") {
        384
    } else {
        768
    }
}

pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    model_id: String,
    dim: usize,
    max_len: usize,
}

impl SentenceEmbedder {
    pub fn load(model_id: &str, model_dir: &Path, max_len: usize, device: Device) -> Result<Self> {
        info!(model = model_id, dir = %model_dir.display(), "loading sentence embedder");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path).with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw_config)
            .with_context(|| format!("{} is not a BERT config", config_path.display()))?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw_config)?["hidden_size"]
            .as_u64()
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;

        let weights = load_weights(model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        info!(model = model_id, dim, "sentence embedder ready");

        Ok(Self { model, tokenizer, device, model_id: model_id.to_string(), dim, max_len })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 100 * texts.len() as u128 {
            warn!(batch = texts.len(), ?elapsed, "slow embedding");
        } else {
            debug!(batch = texts.len(), ?elapsed, "embedded batch");
        }
        Ok(vectors)
    }
}

impl Embedder for SentenceEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn max_len(&self) -> usize {
        self.max_len
    }

    fn embed_batch(&self, texts: &[String]) -> recom_core::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.forward(texts).map_err(|e| Error::Encoding(format!("{e:#}")))
    }
}

/// Prefer `model.safetensors`, fall back to the pickled `pytorch_model.bin`.
fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return weights
            .into_iter()
            .map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) })
            .collect();
    }
    Err(anyhow!("no model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

/// Build the embedder described by `settings`.
///
/// `use_fake` or `APP_USE_FAKE_EMBEDDINGS=1` selects the [`HashEmbedder`];
/// otherwise the model files must be present locally.
pub fn get_default_embedder(settings: &ModelSettings) -> recom_core::Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if settings.use_fake || env_fake {
        info!(model = %settings.name, "using HashEmbedder");
        return Ok(Box::new(HashEmbedder::for_model(&settings.name)));
    }
    let device = select_device(settings.device.parse()?);
    let dir = resolve_model_dir(settings)?;
    let embedder = SentenceEmbedder::load(&settings.name, &dir, settings.max_len, device)
        .map_err(|e| Error::InvalidConfig(format!("cannot load model '{}': {e:#}", settings.name)))?;
    Ok(Box::new(embedder))
}

fn resolve_model_dir(settings: &ModelSettings) -> recom_core::Result<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(dir) = &settings.dir {
        candidates.push(recom_core::config::expand_path(dir));
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        candidates.push(PathBuf::from(dir));
    }
    let short_name = settings.name.rsplit('/').next().unwrap_or(&settings.name);
    candidates.push(Path::new("models").join(short_name));
    candidates.push(Path::new("../models").join(short_name));

    if let Some(found) = candidates.iter().find(|p| p.exists()) {
        info!(dir = %found.display(), "using model dir");
        return Ok(found.clone());
    }
    let checked: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Err(Error::InvalidConfig(format!(
        "could not locate files for model '{}'; checked {}",
        settings.name,
        checked.join(", ")
    )))
}
