// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use fabstir_embed_worker::api::start_server;
use fabstir_embed_worker::config::WorkerConfig;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("Starting Fabstir Embed Worker...");
    info!("Build version: {}", fabstir_embed_worker::version::VERSION);

    let config = WorkerConfig::from_env()?;
    info!(
        "Serving model {} (pooling={}, chunked_processing={}, max_embed_len={})",
        config.model_name,
        config.pooling_type,
        config.enable_chunked_processing,
        config.max_embed_len
    );

    start_server(config).await
}
