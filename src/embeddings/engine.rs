// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pooling-mode embedding engine.
//!
//! Wraps a Candle transformer backbone loaded from a staged snapshot
//! directory (safetensors, `.bin`, or `.pt` checkpoints plus
//! `tokenizer.json`). The engine owns tokenization, windowing of
//! over-length inputs, pooling, and normalization; callers hand it a text
//! batch and get vectors back in input order.

use crate::embeddings::pooling::{self, PoolingType};
use crate::models::download::download;
use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XLMRobertaConfig, XLMRobertaModel,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{info, warn};

/// Fallback model length when neither the configuration nor the checkpoint
/// metadata pins one.
const DEFAULT_MAX_MODEL_LEN: usize = 512;

/// Pooler behavior applied on top of the backbone's hidden states.
#[derive(Debug, Clone)]
pub struct PoolerConfig {
    pub pooling_type: PoolingType,
    /// Post-processing of the pooled vector (L2 normalization).
    pub use_activation: bool,
    /// Window over-length inputs instead of truncating them.
    pub enable_chunked_processing: bool,
    /// Hard cap on embeddable input size, in tokens.
    pub max_embed_len: usize,
}

impl Default for PoolerConfig {
    fn default() -> Self {
        Self {
            pooling_type: PoolingType::Last,
            use_activation: true,
            enable_chunked_processing: true,
            max_embed_len: 3_072_000,
        }
    }
}

/// Engine construction arguments.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Hub repo id or local snapshot directory.
    pub model: String,
    /// Cache directory for hub downloads when the model is not local.
    pub download_dir: Option<PathBuf>,
    pub gpu_memory_utilization: f32,
    pub trust_remote_code: bool,
    /// Model sequence length; `None` means derive it from the checkpoint.
    pub max_model_len: Option<usize>,
    pub enforce_eager: bool,
    pub pooler: PoolerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL_NAME.to_string(),
            download_dir: None,
            gpu_memory_utilization: 0.85,
            trust_remote_code: false,
            max_model_len: None,
            enforce_eager: true,
            pooler: PoolerConfig::default(),
        }
    }
}

enum Backbone {
    Bert(BertModel),
    XlmRoberta(XLMRobertaModel),
}

impl Backbone {
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let hidden = match self {
            Backbone::Bert(model) => {
                model.forward(input_ids, token_type_ids, Some(attention_mask))?
            }
            Backbone::XlmRoberta(model) => model.forward(
                input_ids,
                attention_mask,
                token_type_ids,
                None,
                None,
                None,
            )?,
        };
        Ok(hidden)
    }
}

/// Process-wide embedding engine.
///
/// Construction is expensive (checkpoint load, possibly a hub download);
/// the server holds exactly one instance behind a once-cell.
pub struct EmbeddingEngine {
    backbone: Backbone,
    tokenizer: Tokenizer,
    device: Device,
    model_name: String,
    max_model_len: usize,
    hidden_size: usize,
    pooler: PoolerConfig,
}

impl EmbeddingEngine {
    pub async fn new(config: EngineConfig) -> Result<Self> {
        info!("Loading embedding model: {}", config.model);

        let model_dir = resolve_model_dir(&config).await?;
        let device = Device::cuda_if_available(0)
            .context("failed to select inference device")?;
        info!(
            "Engine device: {:?} (gpu_memory_utilization={}, enforce_eager={})",
            device, config.gpu_memory_utilization, config.enforce_eager
        );
        if config.trust_remote_code {
            // Checkpoints are executed by the in-process runtime only.
            warn!("trust_remote_code is set; hub-provided code is never executed");
        }

        let raw_config = std::fs::read_to_string(model_dir.join("config.json"))
            .with_context(|| format!("missing config.json in {}", model_dir.display()))?;
        let model_config: Value =
            serde_json::from_str(&raw_config).context("invalid model config.json")?;
        let model_type = model_config
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("bert")
            .to_string();
        let hidden_size = model_config
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize;
        let checkpoint_len = model_config
            .get("max_position_embeddings")
            .and_then(|v| v.as_u64())
            .map(|v| v as usize);
        let max_model_len = config
            .max_model_len
            .or(checkpoint_len)
            .unwrap_or(DEFAULT_MAX_MODEL_LEN);

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!(
                "Failed to load tokenizer from {}: {}",
                tokenizer_path.display(),
                e
            )
        })?;

        let backbone = load_backbone(&model_dir, &model_type, &raw_config, &device)?;

        info!(
            "Embedding engine ready: {} ({} hidden, max_model_len={}, pooling={})",
            config.model, hidden_size, max_model_len, config.pooler.pooling_type
        );

        Ok(Self {
            backbone,
            tokenizer,
            device,
            model_name: config.model,
            max_model_len,
            hidden_size,
            pooler: config.pooler,
        })
    }

    /// Embeds a batch of texts, returning one vector per input in order.
    pub fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed_one(text)).collect()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn max_model_len(&self) -> usize {
        self.max_model_len
    }

    pub fn dimension(&self) -> usize {
        self.hidden_size
    }

    pub fn chunked_processing_enabled(&self) -> bool {
        self.pooler.enable_chunked_processing
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        let ids = encoding.get_ids().to_vec();
        let mask = encoding.get_attention_mask().to_vec();
        let type_ids = encoding.get_type_ids().to_vec();

        if ids.is_empty() {
            bail!("tokenizer produced no tokens for input");
        }
        if ids.len() > self.pooler.max_embed_len {
            bail!(
                "input of {} tokens exceeds max_embed_len {}",
                ids.len(),
                self.pooler.max_embed_len
            );
        }

        let pooled = if ids.len() <= self.max_model_len {
            self.forward_window(&ids, &mask, &type_ids)?
        } else if self.pooler.enable_chunked_processing {
            let mut chunks = Vec::new();
            let mut start = 0;
            while start < ids.len() {
                let end = (start + self.max_model_len).min(ids.len());
                let vector =
                    self.forward_window(&ids[start..end], &mask[start..end], &type_ids[start..end])?;
                let active = mask[start..end].iter().filter(|&&m| m != 0).count();
                chunks.push((vector, active));
                start = end;
            }
            pooling::merge_chunks(chunks, self.pooler.pooling_type)?
        } else {
            self.forward_window(
                &ids[..self.max_model_len],
                &mask[..self.max_model_len],
                &type_ids[..self.max_model_len],
            )?
        };

        Ok(if self.pooler.use_activation {
            pooling::normalize(pooled)
        } else {
            pooled
        })
    }

    fn forward_window(&self, ids: &[u32], mask: &[u32], type_ids: &[u32]) -> Result<Vec<f32>> {
        let len = ids.len();
        let input_ids = Tensor::from_vec(
            ids.iter().map(|&x| x as i64).collect::<Vec<i64>>(),
            (1, len),
            &self.device,
        )?;
        let attention_mask = Tensor::from_vec(
            mask.iter().map(|&x| x as i64).collect::<Vec<i64>>(),
            (1, len),
            &self.device,
        )?;
        let token_type_ids = Tensor::from_vec(
            type_ids.iter().map(|&x| x as i64).collect::<Vec<i64>>(),
            (1, len),
            &self.device,
        )?;

        let hidden = self
            .backbone
            .forward(&input_ids, &token_type_ids, &attention_mask)?;
        pooling::pool_hidden(&hidden, mask, self.pooler.pooling_type)
    }
}

/// Uses the configured model as a local snapshot directory when it exists,
/// otherwise stages it from the hub into the download directory.
async fn resolve_model_dir(config: &EngineConfig) -> Result<PathBuf> {
    let candidate = Path::new(&config.model);
    if candidate.is_dir() {
        return Ok(candidate.to_path_buf());
    }
    download(&config.model, None, config.download_dir.as_deref())
        .await
        .with_context(|| format!("failed to stage model {}", config.model))
}

fn load_backbone(
    model_dir: &Path,
    model_type: &str,
    raw_config: &str,
    device: &Device,
) -> Result<Backbone> {
    let weights = weight_files(model_dir)?;
    let vb = if weights
        .first()
        .and_then(|p| p.extension())
        .map_or(false, |ext| ext == "safetensors")
    {
        unsafe { VarBuilder::from_mmaped_safetensors(&weights, DType::F32, device)? }
    } else {
        VarBuilder::from_pth(&weights[0], DType::F32, device)?
    };

    match model_type {
        "bert" => {
            let config: BertConfig =
                serde_json::from_str(raw_config).context("invalid BERT config.json")?;
            Ok(Backbone::Bert(BertModel::load(vb, &config)?))
        }
        "xlm-roberta" => {
            let config: XLMRobertaConfig =
                serde_json::from_str(raw_config).context("invalid XLM-RoBERTa config.json")?;
            Ok(Backbone::XlmRoberta(XLMRobertaModel::new(&config, vb)?))
        }
        other => bail!("unsupported model architecture: {}", other),
    }
}

/// Locates checkpoint files in the snapshot, preferring safetensors shards
/// over `.bin`, and `.bin` over `.pt`.
fn weight_files(model_dir: &Path) -> Result<Vec<PathBuf>> {
    for extension in ["safetensors", "bin", "pt"] {
        let mut matches: Vec<PathBuf> = std::fs::read_dir(model_dir)
            .with_context(|| format!("failed to read model dir {}", model_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == extension))
            .collect();
        if !matches.is_empty() {
            matches.sort();
            return Ok(matches);
        }
    }
    bail!(
        "no model checkpoint (*.safetensors, *.bin, *.pt) in {}",
        model_dir.display()
    )
}
