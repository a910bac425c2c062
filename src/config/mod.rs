// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Environment-derived configuration for the two entry points.
//!
//! Both binaries are configured entirely through process environment, the
//! contract the serverless image is baked against. `from_vars` variants take
//! a plain map so configuration parsing stays testable without mutating the
//! process environment.

use crate::embeddings::PoolingType;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Default model served when `MODEL_NAME` is unset.
pub const DEFAULT_MODEL_NAME: &str = "Qwen/Qwen3-Embedding-0.6B";

/// Configuration for the embedding worker process.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Model identifier: a hub repo id or a local snapshot directory.
    pub model_name: String,
    /// Directory the engine downloads into when the model is not local.
    pub download_dir: Option<PathBuf>,
    /// Fraction of GPU memory the engine may claim.
    pub gpu_memory_utilization: f32,
    /// Whether hub repos carrying custom code are acceptable.
    pub trust_remote_code: bool,
    /// Engine-side windowing of inputs longer than the model length.
    pub enable_chunked_processing: bool,
    /// Hard cap on embeddable input size, in tokens.
    pub max_embed_len: usize,
    /// Reduction applied to token-level hidden states.
    pub pooling_type: PoolingType,
    /// Port the HTTP surface listens on.
    pub api_port: u16,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            model_name: DEFAULT_MODEL_NAME.to_string(),
            download_dir: None,
            gpu_memory_utilization: 0.85,
            trust_remote_code: false,
            enable_chunked_processing: true,
            max_embed_len: 3_072_000,
            pooling_type: PoolingType::Last,
            api_port: 8080,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let gpu_memory_utilization = match vars.get("GPU_MEMORY_UTILIZATION") {
            Some(raw) => raw
                .parse::<f32>()
                .with_context(|| format!("invalid GPU_MEMORY_UTILIZATION: {:?}", raw))?,
            None => defaults.gpu_memory_utilization,
        };

        let max_embed_len = match vars.get("MAX_EMBED_LEN") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("invalid MAX_EMBED_LEN: {:?}", raw))?,
            None => defaults.max_embed_len,
        };

        let pooling_type = match vars.get("POOLING_TYPE") {
            Some(raw) => raw.parse::<PoolingType>().map_err(|e| anyhow!(e))?,
            None => defaults.pooling_type,
        };

        let api_port = match vars.get("API_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid API_PORT: {:?}", raw))?,
            None => defaults.api_port,
        };

        Ok(Self {
            model_name: vars
                .get("MODEL_NAME")
                .cloned()
                .unwrap_or(defaults.model_name),
            download_dir: vars
                .get("DOWNLOAD_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            gpu_memory_utilization,
            trust_remote_code: parse_bool(vars.get("TRUST_REMOTE_CODE")),
            enable_chunked_processing: vars
                .get("ENABLE_CHUNKED_PROCESSING")
                .map_or(defaults.enable_chunked_processing, |v| {
                    v.to_lowercase() == "true"
                }),
            max_embed_len,
            pooling_type,
            api_port,
        })
    }
}

/// Configuration for the one-shot model fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub model_name: String,
    pub revision: Option<String>,
    pub cache_dir: Option<PathBuf>,
    /// Base directory of the metadata record, `/` in the baked image.
    pub metadata_dir: PathBuf,
}

impl FetchConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let model_name = vars
            .get("MODEL_NAME")
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| anyhow!("MODEL_NAME must be set"))?;

        Ok(Self {
            model_name,
            revision: vars
                .get("MODEL_REVISION")
                .filter(|v| !v.is_empty())
                .cloned(),
            cache_dir: vars
                .get("HF_HOME")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            metadata_dir: vars
                .get("MODEL_ARGS_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/")),
        })
    }
}

fn parse_bool(value: Option<&String>) -> bool {
    value.map_or(false, |v| v.to_lowercase() == "true")
}
