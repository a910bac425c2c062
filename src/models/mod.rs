// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod download;

pub use download::{download, write_model_metadata, DownloadError};
