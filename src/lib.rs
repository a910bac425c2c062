// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod embeddings;
pub mod models;
pub mod utils;
pub mod version;

// Re-export main types
pub use api::{
    run_handler, ApiError, EmbeddingInput, EmbeddingRecord, EmbeddingResponse, ErrorResponse,
    RunRequest, Usage,
};
pub use config::{FetchConfig, WorkerConfig};
pub use embeddings::{EmbeddingEngine, EngineConfig, PoolerConfig, PoolingType};
pub use models::download::{download, write_model_metadata, DownloadError};
