// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Wall-clock timing instrumentation for long-running operations.

use std::future::Future;
use std::time::Instant;
use tracing::info;

/// Runs `operation`, logs how long it took, and returns its output unchanged.
///
/// Purely observational: values, errors, and argument passing are untouched,
/// so it can wrap any fallible or infallible future.
///
/// # Example
/// ```ignore
/// let path = timed("download", download(&name, None, None)).await?;
/// ```
pub async fn timed<F, T>(name: &str, operation: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let result = operation.await;
    info!(
        "{} completed in {:.2} seconds",
        name,
        start.elapsed().as_secs_f64()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timed_passes_value_through() {
        let value = timed("add", async { 40 + 2 }).await;
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_timed_passes_error_through() {
        let result: Result<u32, String> =
            timed("fail", async { Err("boom".to_string()) }).await;
        assert_eq!(result, Err("boom".to_string()));
    }

    #[tokio::test]
    async fn test_timed_preserves_ok_result() {
        let result: anyhow::Result<&str> = timed("ok", async { Ok("done") }).await;
        assert_eq!(result.unwrap(), "done");
    }
}
