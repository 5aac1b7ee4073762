use anyhow::{Result, anyhow, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{XLMRobertaModel, Config as XLMRobertaConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use c4rag_core::config::EmbeddingConfig;
use c4rag_core::error::{Error, Result as CoreResult};
use c4rag_core::traits::Embedder;
use c4rag_core::types::Vector;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;
use crate::{check_input, InputKind};

/// BGE-M3 (XLM-RoBERTa encoder) with masked mean pooling.
pub struct BgeEmbedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    id: String,
}

impl BgeEmbedder {
    /// Loads `tokenizer.json`, `config.json` and either `model.safetensors`
    /// or `pytorch_model.bin` from `model_dir`.
    pub fn load(model_dir: &Path, config: &EmbeddingConfig) -> Result<Self> {
        let device = select_device(config.device);
        info!(model_dir = %model_dir.display(), "🔄 Loading BGE model");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_path = model_dir.join("config.json");
        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        let model_config: XLMRobertaConfig = serde_json::from_str(&raw_config)?;
        let hidden_size = serde_json::from_str::<serde_json::Value>(&raw_config)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("{} has no hidden_size", config_path.display()))? as usize;
        if hidden_size != config.dimension {
            bail!("model hidden size {} differs from embedding.dimension {}", hidden_size, config.dimension);
        }

        let dtype = DType::F32;
        let vb = match weights_file(model_dir)? {
            Weights::SafeTensors(path) => {
                debug!(path = %path.display(), "📥 Loading safetensors weights");
                // SAFETY: the weights file is not modified while the model is alive.
                unsafe { VarBuilder::from_mmaped_safetensors(&[path], dtype, &device)? }
            }
            Weights::Pickle(path) => {
                debug!(path = %path.display(), "📥 Loading pickle weights");
                let weights = candle_core::pickle::read_all(&path)?;
                let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
                VarBuilder::from_tensors(weights_map, dtype, &device)
            }
        };
        let model = XLMRobertaModel::new(&model_config, vb)?;
        let name = model_dir.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_else(|| "bge".to_string());
        info!("✅ BGE model loaded (dim={})", hidden_size);
        Ok(Self { model, tokenizer, device, dim: hidden_size, max_len: config.max_len, id: format!("bge:{}:d{}", name, hidden_size) })
    }

    fn forward(&self, texts: &[String]) -> Result<Vec<Vector>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let rows: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.to_vec2()?;
        debug!(batch = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(rows)
    }
}

enum Weights {
    SafeTensors(PathBuf),
    Pickle(PathBuf),
}

fn weights_file(model_dir: &Path) -> Result<Weights> {
    let st = model_dir.join("model.safetensors");
    if st.exists() { return Ok(Weights::SafeTensors(st)); }
    let bin = model_dir.join("pytorch_model.bin");
    if bin.exists() { return Ok(Weights::Pickle(bin)); }
    Err(anyhow!("no model.safetensors or pytorch_model.bin under {}", model_dir.display()))
}

impl Embedder for BgeEmbedder {
    fn embedder_id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> CoreResult<Vec<Vector>> {
        let mut out = vec![vec![0f32; self.dim]; texts.len()];
        let mut pending_idx = Vec::new();
        let mut pending = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            if check_input(text)? == InputKind::Text {
                pending_idx.push(i);
                pending.push(text.clone());
            }
        }
        if pending.is_empty() { return Ok(out); }
        let rows = self.forward(&pending).map_err(|e| Error::Encoding(format!("{:#}", e)))?;
        for (i, row) in pending_idx.into_iter().zip(rows) {
            if row.iter().any(|x| !x.is_finite()) {
                return Err(Error::Encoding(format!("non-finite embedding for input {}", i)));
            }
            out[i] = row;
        }
        Ok(out)
    }
}
