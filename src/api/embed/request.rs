// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Request types and validation for the embedding endpoint.
//!
//! `prompt` and `encoding_format` arrive as raw JSON so the shape checks
//! can answer with the endpoint's exact error strings instead of a
//! deserializer rejection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub input: EmbeddingInput,
}

/// The `input` object of a run request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbeddingInput {
    /// A single string or a list of strings to embed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<Value>,

    /// Accepted for compatibility with other worker payloads; unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconds: Option<Value>,

    /// Vector encoding requested by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<Value>,
}

/// Wire encodings a client may ask for.
///
/// The response always carries float vectors; the flag is validated for
/// contract compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    Float,
    Base64,
}

/// A request that passed every validation step.
#[derive(Debug, Clone)]
pub struct ValidatedBatch {
    pub texts: Vec<String>,
    pub encoding_format: EncodingFormat,
}

/// Validates the raw input, short-circuiting on the first failure.
///
/// Order: prompt shape, emptiness, element types, encoding format. The
/// returned message is the exact payload of the `{"error": ...}` response.
pub fn validate(input: &EmbeddingInput) -> Result<ValidatedBatch, String> {
    let texts = match &input.prompt {
        Some(Value::String(text)) => vec![text.clone()],
        Some(Value::Array(items)) => {
            if items.is_empty() {
                return Err("Empty input".to_string());
            }
            if !items.iter().all(|item| item.is_string()) {
                return Err("All inputs must be strings".to_string());
            }
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(str::to_string)
                .collect()
        }
        _ => return Err("'input' must be a string or list of strings".to_string()),
    };

    let encoding_format = match &input.encoding_format {
        None => EncodingFormat::Float,
        Some(Value::String(format)) if format == "float" => EncodingFormat::Float,
        Some(Value::String(format)) if format == "base64" => EncodingFormat::Base64,
        Some(_) => {
            return Err("encoding_format must be 'float' or 'base64'".to_string());
        }
    };

    Ok(ValidatedBatch {
        texts,
        encoding_format,
    })
}
