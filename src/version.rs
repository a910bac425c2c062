// Version information for the Fabstir Embed Worker

/// Full version string with feature description
pub const VERSION: &str = "v0.1.0-pooling-worker-2025-08-06";

/// Semantic version number
pub const VERSION_NUMBER: &str = "0.1.0";

/// Build date
pub const BUILD_DATE: &str = "2025-08-06";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "pattern-group-download",
    "safetensors",
    "pytorch-bin",
    "pytorch-pt",
    "last-pooling",
    "mean-pooling",
    "cls-pooling",
    "chunked-processing",
];
