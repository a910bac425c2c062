// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding Engine Module
//!
//! Pooling-mode inference over Candle transformer backbones: snapshot
//! resolution, tokenization, windowing, pooling, and normalization live
//! here. The HTTP layer holds exactly one [`EmbeddingEngine`] behind a
//! once-cell and treats it as the external inference boundary.

pub mod engine;
pub mod pooling;

pub use engine::{EmbeddingEngine, EngineConfig, PoolerConfig};
pub use pooling::PoolingType;

use crate::config::WorkerConfig;

impl From<&WorkerConfig> for EngineConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            model: config.model_name.clone(),
            download_dir: config.download_dir.clone(),
            gpu_memory_utilization: config.gpu_memory_utilization,
            trust_remote_code: config.trust_remote_code,
            // Unbounded: the engine derives the length from the checkpoint.
            max_model_len: None,
            enforce_eager: true,
            pooler: PoolerConfig {
                pooling_type: config.pooling_type,
                use_activation: true,
                enable_chunked_processing: config.enable_chunked_processing,
                max_embed_len: config.max_embed_len,
            },
        }
    }
}
