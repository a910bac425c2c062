// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod embed;
pub mod errors;
pub mod server;

pub use embed::{
    run_handler, EmbeddingInput, EmbeddingRecord, EmbeddingResponse, EncodingFormat, RunRequest,
    Usage, ValidatedBatch,
};
pub use errors::{ApiError, ErrorResponse};
pub use server::{router, start_server, AppState};
