// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /run handler.
//!
//! The handler never propagates an error to the platform: validation
//! failures become `{"error": ...}` payloads, and only an unservable
//! request (engine bootstrap or inference failure) maps to a 5xx.

use crate::api::embed::request::{validate, RunRequest};
use crate::api::embed::response::EmbeddingResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

pub async fn run_handler(
    State(state): State<AppState>,
    Json(request): Json<RunRequest>,
) -> Response {
    let request_id = Uuid::new_v4();

    let batch = match validate(&request.input) {
        Ok(batch) => batch,
        Err(message) => {
            info!(%request_id, "request rejected: {}", message);
            return Json(json!({ "error": message })).into_response();
        }
    };

    let engine = match state.engine().await {
        Ok(engine) => engine,
        Err(e) => {
            error!(%request_id, "Error loading model: {:#}", e);
            return ApiError::EngineInitFailed(e.to_string()).into_response();
        }
    };

    let texts = batch.texts;
    let lengths: Vec<usize> = texts.iter().map(|text| text.chars().count()).collect();
    let min_len = lengths.iter().copied().min().unwrap_or(0);
    let max_len = lengths.iter().copied().max().unwrap_or(0);
    let avg_len = lengths.iter().sum::<usize>() / lengths.len().max(1);
    info!(%request_id, "Generating embeddings for {} text(s)", texts.len());
    info!(
        "Text lengths (chars): min={}, max={}, avg={}",
        min_len, max_len, avg_len
    );

    // Rough char estimate of the model window
    let long_text_threshold = engine.max_model_len() * 3;
    let long_texts = lengths
        .iter()
        .filter(|&&length| length > long_text_threshold)
        .count();
    if long_texts > 0 && engine.chunked_processing_enabled() {
        info!(
            "Detected {} potentially long text(s) - chunked processing will handle automatically",
            long_texts
        );
    }

    let start = Instant::now();
    let embed_engine = engine.clone();
    let embed_texts = texts.clone();
    let outputs =
        tokio::task::spawn_blocking(move || embed_engine.embed(&embed_texts)).await;
    let embeddings = match outputs {
        Ok(Ok(embeddings)) => embeddings,
        Ok(Err(e)) => {
            error!(%request_id, "embedding failed: {:#}", e);
            return ApiError::InferenceFailed(e.to_string()).into_response();
        }
        Err(e) => {
            error!(%request_id, "embedding task failed: {}", e);
            return ApiError::InferenceFailed(e.to_string()).into_response();
        }
    };
    let inference_time = start.elapsed().as_secs_f64();

    let response = EmbeddingResponse::new(state.config.model_name.clone(), embeddings, &texts);
    info!(
        "Generated {} embeddings in {:.2}s",
        response.data.len(),
        inference_time
    );
    info!(
        "Avg time per embedding: {:.3}s",
        inference_time / response.data.len().max(1) as f64
    );

    Json(response).into_response()
}
