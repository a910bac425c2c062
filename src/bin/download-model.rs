// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! One-shot model fetcher.
//!
//! Resolves `MODEL_NAME`/`MODEL_REVISION` to a local snapshot directory by
//! trying the checkpoint pattern groups in priority order, then records the
//! resolved path for the image bake step. Runs at image-build or cold-start
//! time; failures are fatal.

use anyhow::{Context, Result};
use fabstir_embed_worker::config::FetchConfig;
use fabstir_embed_worker::models::download::{download, write_model_metadata};
use fabstir_embed_worker::utils::timed;
use std::env;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = FetchConfig::from_env()?;
    info!(
        "Fetching model {} (revision: {})",
        config.model_name,
        config.revision.as_deref().unwrap_or("default")
    );

    let model_path = timed(
        "download",
        download(
            &config.model_name,
            config.revision.as_deref(),
            config.cache_dir.as_deref(),
        ),
    )
    .await?;

    let model_path_str = model_path
        .to_str()
        .context("resolved model path is not valid UTF-8")?;
    let metadata_path = write_model_metadata(
        &config.metadata_dir,
        model_path_str,
        config.revision.as_deref(),
    )?;
    info!(
        "Resolved {} -> {} (metadata at {})",
        config.model_name,
        model_path.display(),
        metadata_path.display()
    );

    Ok(())
}
