// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Pattern-group snapshot download from the HuggingFace Hub.
//!
//! Model files are fetched by trying filename-pattern groups in a fixed
//! priority order: safetensors first, then legacy `.bin` checkpoints, then
//! raw `.pt` tensor checkpoints. Every group also pulls the tokenizer files
//! so the staged snapshot is directly loadable by the engine. The first
//! group that leaves a matching file on disk wins.

use anyhow::{Context, Result};
use hf_hub::api::tokio::{ApiBuilder, ApiRepo};
use hf_hub::{Repo, RepoType};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Tokenizer files staged alongside every model checkpoint group.
pub const TOKENIZER_PATTERNS: [&str; 2] = ["*.json", "tokenizer*"];

/// Checkpoint patterns in priority order.
pub const MODEL_PATTERNS: [&str; 3] = ["*.safetensors", "*.bin", "*.pt"];

/// Well-known name of the metadata record consumed at image-bake time.
pub const MODEL_ARGS_FILE: &str = "local_model_args.json";

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("No patterns matching {0:?} found for download")]
    NoMatchingPatterns(Vec<Vec<String>>),
    #[error("Hub error: {0}")]
    Hub(String),
}

/// The pattern groups tried against the repository, in priority order.
/// Each checkpoint pattern is extended with the tokenizer patterns.
pub fn pattern_sets() -> Vec<Vec<String>> {
    MODEL_PATTERNS
        .iter()
        .map(|model_pattern| {
            let mut set = vec![model_pattern.to_string()];
            set.extend(TOKENIZER_PATTERNS.iter().map(|p| p.to_string()));
            set
        })
        .collect()
}

/// Glob-style match of `name` against `pattern`, where `*` matches any run
/// of characters (fnmatch semantics, so nested paths match too).
pub fn matches_pattern(pattern: &str, name: &str) -> bool {
    fn matches(p: &[u8], n: &[u8]) -> bool {
        match (p.first(), n.first()) {
            (None, None) => true,
            (Some(b'*'), _) => {
                matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..]))
            }
            (Some(pc), Some(nc)) if pc == nc => matches(&p[1..], &n[1..]),
            _ => false,
        }
    }
    matches(pattern.as_bytes(), name.as_bytes())
}

/// Resolves `name` to a local snapshot directory containing usable model
/// files, downloading them from the hub if needed.
///
/// Tries each pattern group in priority order and returns the snapshot
/// directory of the first group that yields at least one local file match.
/// Fails with [`DownloadError::NoMatchingPatterns`] naming every attempted
/// group when none match.
pub async fn download(
    name: &str,
    revision: Option<&str>,
    cache_dir: Option<&Path>,
) -> Result<PathBuf> {
    let mut builder = ApiBuilder::new().with_progress(false);
    if let Some(dir) = cache_dir {
        builder = builder.with_cache_dir(dir.to_path_buf());
    }
    let api = builder.build().context("failed to build hub API client")?;

    let repo = match revision {
        Some(rev) => Repo::with_revision(name.to_string(), RepoType::Model, rev.to_string()),
        None => Repo::new(name.to_string(), RepoType::Model),
    };
    let repo = api.repo(repo);

    let attempted = pattern_sets();
    let remote_files = list_repo_files(&repo).await?;

    for pattern_set in &attempted {
        let matched: Vec<&str> = remote_files
            .iter()
            .map(|f| f.as_str())
            .filter(|f| pattern_set.iter().any(|p| matches_pattern(p, f)))
            .collect();
        if matched.is_empty() {
            continue;
        }

        let mut snapshot_dir: Option<PathBuf> = None;
        for rfilename in &matched {
            let local = repo
                .get(rfilename)
                .await
                .with_context(|| format!("failed to download {} from {}", rfilename, name))?;
            snapshot_dir.get_or_insert_with(|| snapshot_root(&local, rfilename));
        }

        if let Some(dir) = snapshot_dir {
            for pattern in pattern_set {
                if local_match_exists(&dir, pattern)? {
                    info!("Successfully downloaded {} model files.", pattern);
                    return Ok(dir);
                }
            }
        }
    }

    Err(DownloadError::NoMatchingPatterns(attempted).into())
}

/// Writes the metadata record consumed by the image bake step.
///
/// Keys with empty or absent values are omitted so the baked environment
/// never sees blank overrides. Returns the path written.
pub fn write_model_metadata(
    dir: &Path,
    model_path: &str,
    revision: Option<&str>,
) -> Result<PathBuf> {
    let mut metadata = Map::new();
    if !model_path.is_empty() {
        metadata.insert(
            "MODEL_NAME".to_string(),
            Value::String(model_path.to_string()),
        );
    }
    if let Some(rev) = revision.filter(|r| !r.is_empty()) {
        metadata.insert("MODEL_REVISION".to_string(), Value::String(rev.to_string()));
    }

    let path = dir.join(MODEL_ARGS_FILE);
    let contents = serde_json::to_string(&Value::Object(metadata))?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Lists the repository's file names for the pinned revision.
///
/// A hub-side "no files for these constraints" condition surfaces as the
/// consolidated pattern error; transport failures propagate unmodified.
async fn list_repo_files(repo: &ApiRepo) -> Result<Vec<String>> {
    let repo_info = repo
        .info()
        .await
        .map_err(|e| DownloadError::Hub(e.to_string()))?;
    Ok(repo_info
        .siblings
        .into_iter()
        .map(|s| s.rfilename)
        .collect())
}

/// Strips the repo-relative filename components off a cached file path,
/// leaving the snapshot directory.
fn snapshot_root(local: &Path, rfilename: &str) -> PathBuf {
    let mut root = local.to_path_buf();
    for _ in Path::new(rfilename).components() {
        root.pop();
    }
    root
}

/// Checks the snapshot directory's top level for a file matching `pattern`.
fn local_match_exists(dir: &Path, pattern: &str) -> Result<bool> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read snapshot dir {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if matches_pattern(pattern, name) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_sets_priority_order() {
        let sets = pattern_sets();
        assert_eq!(sets.len(), 3);
        assert_eq!(sets[0][0], "*.safetensors");
        assert_eq!(sets[1][0], "*.bin");
        assert_eq!(sets[2][0], "*.pt");
        for set in &sets {
            assert_eq!(&set[1..], &["*.json", "tokenizer*"]);
        }
    }

    #[test]
    fn test_matches_pattern_suffix_glob() {
        assert!(matches_pattern("*.safetensors", "model.safetensors"));
        assert!(matches_pattern(
            "*.safetensors",
            "model-00001-of-00002.safetensors"
        ));
        assert!(!matches_pattern("*.safetensors", "model.bin"));
        assert!(!matches_pattern("*.bin", "model.safetensors"));
    }

    #[test]
    fn test_matches_pattern_prefix_glob() {
        assert!(matches_pattern("tokenizer*", "tokenizer.json"));
        assert!(matches_pattern("tokenizer*", "tokenizer_config.json"));
        assert!(matches_pattern("tokenizer*", "tokenizer"));
        assert!(!matches_pattern("tokenizer*", "special_tokens_map.json"));
    }

    #[test]
    fn test_matches_pattern_literal() {
        assert!(matches_pattern("config.json", "config.json"));
        assert!(!matches_pattern("config.json", "config.json.bak"));
    }

    #[test]
    fn test_matches_pattern_crosses_directories() {
        // fnmatch semantics: the hub filter treats paths as flat strings
        assert!(matches_pattern("*.json", "onnx/config.json"));
    }

    #[test]
    fn test_snapshot_root_strips_nested_components() {
        let local = Path::new("/cache/snapshots/abc/onnx/model.safetensors");
        assert_eq!(
            snapshot_root(local, "onnx/model.safetensors"),
            PathBuf::from("/cache/snapshots/abc")
        );
        let local = Path::new("/cache/snapshots/abc/model.safetensors");
        assert_eq!(
            snapshot_root(local, "model.safetensors"),
            PathBuf::from("/cache/snapshots/abc")
        );
    }

    #[test]
    fn test_local_match_exists() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("model.safetensors"), b"x").unwrap();
        assert!(local_match_exists(dir.path(), "*.safetensors").unwrap());
        assert!(!local_match_exists(dir.path(), "*.bin").unwrap());
    }

    #[test]
    fn test_write_model_metadata_omits_empty_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model_metadata(dir.path(), "/models/snap", None).unwrap();
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["MODEL_NAME"], "/models/snap");
        assert!(value.get("MODEL_REVISION").is_none());

        let path = write_model_metadata(dir.path(), "/models/snap", Some("")).unwrap();
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(value.get("MODEL_REVISION").is_none());
    }

    #[test]
    fn test_write_model_metadata_includes_revision() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_model_metadata(dir.path(), "/models/snap", Some("main")).unwrap();
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["MODEL_REVISION"], "main");
    }

    #[test]
    fn test_no_matching_patterns_error_names_all_groups() {
        let err = DownloadError::NoMatchingPatterns(pattern_sets());
        let message = err.to_string();
        assert!(message.contains("*.safetensors"));
        assert!(message.contains("*.bin"));
        assert!(message.contains("*.pt"));
        assert!(message.contains("tokenizer*"));
    }
}
