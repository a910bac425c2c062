// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Response envelope for the embedding endpoint.

use serde::{Deserialize, Serialize};

/// One embedding record, carrying its zero-based position in the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub object: String,
    pub embedding: Vec<f32>,
    pub index: usize,
}

/// Token accounting for the request.
///
/// Both fields carry the same character-based estimate (total characters
/// divided by 4) — a rough approximation, not a tokenizer-exact count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub total_tokens: usize,
}

/// OpenAI-embeddings-style response for `POST /run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub object: String,
    pub data: Vec<EmbeddingRecord>,
    pub model: String,
    pub usage: Usage,
}

impl EmbeddingResponse {
    /// Assembles the envelope from engine outputs, in input order.
    pub fn new(model: impl Into<String>, embeddings: Vec<Vec<f32>>, texts: &[String]) -> Self {
        let data = embeddings
            .into_iter()
            .enumerate()
            .map(|(index, embedding)| EmbeddingRecord {
                object: "embedding".to_string(),
                embedding,
                index,
            })
            .collect();

        let estimated = estimate_tokens(texts);
        Self {
            object: "list".to_string(),
            data,
            model: model.into(),
            usage: Usage {
                prompt_tokens: estimated,
                total_tokens: estimated,
            },
        }
    }
}

/// Character-based token estimate: 1 token per 4 characters.
pub fn estimate_tokens(texts: &[String]) -> usize {
    let total_chars: usize = texts.iter().map(|text| text.chars().count()).sum();
    total_chars / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_are_indexed_in_input_order() {
        let texts = vec!["hello".to_string(), "world".to_string()];
        let response =
            EmbeddingResponse::new("test-model", vec![vec![0.1, 0.2], vec![0.3, 0.4]], &texts);

        assert_eq!(response.object, "list");
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].index, 0);
        assert_eq!(response.data[0].object, "embedding");
        assert_eq!(response.data[0].embedding, vec![0.1, 0.2]);
        assert_eq!(response.data[1].index, 1);
        assert_eq!(response.model, "test-model");
    }

    #[test]
    fn test_usage_is_chars_over_four() {
        let texts = vec!["hello".to_string(), "world".to_string()];
        let response = EmbeddingResponse::new("m", vec![vec![0.0], vec![0.0]], &texts);
        // (5 + 5) / 4 == 2
        assert_eq!(response.usage.prompt_tokens, 2);
        assert_eq!(response.usage.total_tokens, 2);
    }

    #[test]
    fn test_estimate_counts_characters_not_bytes() {
        let texts = vec!["ééééééé".to_string(), "!".to_string()];
        // 8 characters -> 2 estimated tokens
        assert_eq!(estimate_tokens(&texts), 2);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let texts = vec!["abcd".repeat(10)];
        assert_eq!(estimate_tokens(&texts), estimate_tokens(&texts));
        assert_eq!(estimate_tokens(&texts), 10);
    }

    #[test]
    fn test_serialized_field_names() {
        let response = EmbeddingResponse::new("m", vec![vec![1.0]], &["abcd".to_string()]);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["object"], "list");
        assert_eq!(json["data"][0]["object"], "embedding");
        assert_eq!(json["data"][0]["index"], 0);
        assert_eq!(json["usage"]["total_tokens"], 1);
    }
}
