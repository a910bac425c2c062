// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Reduction of token-level hidden states to a single embedding vector.

use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor};
use std::fmt;
use std::str::FromStr;

/// Strategy for reducing per-token model outputs to one fixed-size vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingType {
    /// Representation of the last non-padding token.
    Last,
    /// Attention-mask-weighted mean over all tokens.
    Mean,
    /// Representation of the first token.
    Cls,
}

impl FromStr for PoolingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LAST" => Ok(PoolingType::Last),
            "MEAN" => Ok(PoolingType::Mean),
            "CLS" => Ok(PoolingType::Cls),
            other => Err(format!(
                "invalid POOLING_TYPE {:?}: expected LAST, MEAN, or CLS",
                other
            )),
        }
    }
}

impl fmt::Display for PoolingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolingType::Last => "LAST",
            PoolingType::Mean => "MEAN",
            PoolingType::Cls => "CLS",
        };
        write!(f, "{}", name)
    }
}

/// Pools hidden states of shape `[1, seq_len, hidden]` into one vector.
///
/// `attention_mask` carries the tokenizer's mask for the same window; padded
/// positions are excluded from the reduction.
pub fn pool_hidden(
    hidden: &Tensor,
    attention_mask: &[u32],
    pooling: PoolingType,
) -> Result<Vec<f32>> {
    match pooling {
        PoolingType::Mean => {
            let (_batch, seq_len, _hidden) = hidden.dims3()?;
            let mask_values: Vec<f32> = attention_mask.iter().map(|&m| m as f32).collect();
            let mask = Tensor::from_vec(mask_values, (1, seq_len), hidden.device())?
                .to_dtype(DType::F32)?
                .unsqueeze(2)?;
            let masked = hidden.broadcast_mul(&mask)?;
            let summed = masked.sum(1)?;
            let mask_sum = mask.sum(1)?.clamp(1e-9, f64::INFINITY)?;
            let pooled = summed.broadcast_div(&mask_sum)?;
            Ok(pooled.squeeze(0)?.to_vec1::<f32>()?)
        }
        PoolingType::Last => {
            let index = attention_mask
                .iter()
                .rposition(|&m| m != 0)
                .ok_or_else(|| anyhow!("attention mask has no active tokens"))?;
            Ok(hidden
                .narrow(1, index, 1)?
                .squeeze(1)?
                .squeeze(0)?
                .to_vec1::<f32>()?)
        }
        PoolingType::Cls => Ok(hidden
            .narrow(1, 0, 1)?
            .squeeze(1)?
            .squeeze(0)?
            .to_vec1::<f32>()?),
    }
}

/// Merges per-chunk pooled vectors for a single over-length input.
///
/// Mean pooling averages the chunks weighted by their active token counts;
/// last pooling keeps the final chunk; CLS pooling keeps the first.
pub fn merge_chunks(chunks: Vec<(Vec<f32>, usize)>, pooling: PoolingType) -> Result<Vec<f32>> {
    if chunks.is_empty() {
        return Err(anyhow!("no chunks to merge"));
    }
    match pooling {
        PoolingType::Mean => {
            let dim = chunks[0].0.len();
            let mut merged = vec![0.0f32; dim];
            let mut total = 0usize;
            for (vector, tokens) in &chunks {
                total += tokens;
                for (slot, value) in merged.iter_mut().zip(vector.iter()) {
                    *slot += value * *tokens as f32;
                }
            }
            let total = (total as f32).max(1.0);
            for slot in &mut merged {
                *slot /= total;
            }
            Ok(merged)
        }
        PoolingType::Last => Ok(chunks.into_iter().last().map(|(v, _)| v).unwrap()),
        PoolingType::Cls => Ok(chunks.into_iter().next().map(|(v, _)| v).unwrap()),
    }
}

/// L2-normalizes a pooled vector in place.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-12);
    for value in &mut vector {
        *value /= norm;
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn hidden_fixture() -> Tensor {
        // [1, 3, 2]: rows [1,2], [3,4], [5,6]
        Tensor::from_vec(
            vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0],
            (1, 3, 2),
            &Device::Cpu,
        )
        .unwrap()
    }

    #[test]
    fn test_pooling_type_parse() {
        assert_eq!("LAST".parse::<PoolingType>().unwrap(), PoolingType::Last);
        assert_eq!("mean".parse::<PoolingType>().unwrap(), PoolingType::Mean);
        assert_eq!("Cls".parse::<PoolingType>().unwrap(), PoolingType::Cls);
        assert!("MIDDLE".parse::<PoolingType>().is_err());
    }

    #[test]
    fn test_mean_pooling_ignores_padding() {
        let hidden = hidden_fixture();
        let pooled = pool_hidden(&hidden, &[1, 1, 0], PoolingType::Mean).unwrap();
        assert_eq!(pooled.len(), 2);
        assert!((pooled[0] - 2.0).abs() < 1e-5);
        assert!((pooled[1] - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_last_pooling_picks_last_active_token() {
        let hidden = hidden_fixture();
        let pooled = pool_hidden(&hidden, &[1, 1, 0], PoolingType::Last).unwrap();
        assert_eq!(pooled, vec![3.0, 4.0]);
    }

    #[test]
    fn test_cls_pooling_picks_first_token() {
        let hidden = hidden_fixture();
        let pooled = pool_hidden(&hidden, &[1, 1, 1], PoolingType::Cls).unwrap();
        assert_eq!(pooled, vec![1.0, 2.0]);
    }

    #[test]
    fn test_last_pooling_requires_active_token() {
        let hidden = hidden_fixture();
        assert!(pool_hidden(&hidden, &[0, 0, 0], PoolingType::Last).is_err());
    }

    #[test]
    fn test_merge_chunks_weighted_mean() {
        let merged = merge_chunks(
            vec![(vec![1.0, 1.0], 3), (vec![5.0, 5.0], 1)],
            PoolingType::Mean,
        )
        .unwrap();
        assert!((merged[0] - 2.0).abs() < 1e-5);
        assert!((merged[1] - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_merge_chunks_last_and_cls() {
        let chunks = vec![(vec![1.0], 4), (vec![2.0], 2)];
        assert_eq!(
            merge_chunks(chunks.clone(), PoolingType::Last).unwrap(),
            vec![2.0]
        );
        assert_eq!(merge_chunks(chunks, PoolingType::Cls).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_normalize_unit_length() {
        let normalized = normalize(vec![3.0, 4.0]);
        let magnitude = normalized.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
        assert!((normalized[0] - 0.6).abs() < 1e-5);
    }
}
