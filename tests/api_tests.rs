// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! End-to-end tests for the worker's HTTP surface.
//!
//! Validation failures must come back as HTTP 200 with an `{"error": ...}`
//! payload and must short-circuit before any engine work happens — none of
//! these tests require model files on disk.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use fabstir_embed_worker::api::{router, AppState};
use fabstir_embed_worker::config::WorkerConfig;
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> axum::Router {
    router(AppState::new(WorkerConfig::default()))
}

async fn post_run(payload: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = serde_json::from_slice(&bytes).expect("json body");
    (status, value)
}

#[tokio::test]
async fn test_empty_prompt_list_yields_empty_input_error() {
    let (status, body) = post_run(json!({"input": {"prompt": []}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"error": "Empty input"}));
}

#[tokio::test]
async fn test_missing_prompt_yields_shape_error() {
    let (status, body) = post_run(json!({"input": {}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "'input' must be a string or list of strings"
    );
}

#[tokio::test]
async fn test_numeric_prompt_yields_shape_error() {
    let (_, body) = post_run(json!({"input": {"prompt": 12}})).await;
    assert_eq!(
        body["error"],
        "'input' must be a string or list of strings"
    );
}

#[tokio::test]
async fn test_non_string_element_yields_type_error() {
    let (_, body) = post_run(json!({"input": {"prompt": ["fine", false]}})).await;
    assert_eq!(body["error"], "All inputs must be strings");
}

#[tokio::test]
async fn test_bad_encoding_format_rejected_before_inference() {
    let (status, body) =
        post_run(json!({"input": {"prompt": "x", "encoding_format": "yaml"}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["error"],
        "encoding_format must be 'float' or 'base64'"
    );
}

#[tokio::test]
async fn test_malformed_json_is_a_transport_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_model_and_cold_engine() {
    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json body");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "Qwen/Qwen3-Embedding-0.6B");
    assert_eq!(body["engine_ready"], false);
}
