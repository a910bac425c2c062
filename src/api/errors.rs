// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error payload returned to clients.
///
/// # Fields
/// - `message`: Human-readable explanation
/// - `error_type`: Error category tag (serialized as `type`)
/// - `code`: HTTP-style status code
/// - `request_id`: Correlation id, when one was assigned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    /// Builds an error payload with the default tag (`BadRequestError`) and
    /// the default status code (400).
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_details(message, "BadRequestError", 400)
    }

    /// Builds an error payload with an explicit tag and status code.
    pub fn with_details(message: impl Into<String>, error_type: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            error_type: error_type.into(),
            code,
            request_id: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// Errors surfaced by the HTTP layer.
///
/// Request validation failures never reach this type; the embed handler
/// converts those to `{"error": ...}` payloads directly. `ApiError` covers
/// the failures that make a request unservable.
#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    EngineInitFailed(String),
    InferenceFailed(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) => 400,
            ApiError::EngineInitFailed(_) => 500,
            ApiError::InferenceFailed(_) => 500,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::InvalidRequest(_) => "BadRequestError",
            ApiError::EngineInitFailed(_) => "InternalServerError",
            ApiError::InferenceFailed(_) => "InternalServerError",
        }
    }

    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let mut response =
            ErrorResponse::with_details(self.to_string(), self.error_type(), self.status_code());
        response.request_id = request_id;
        response
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::EngineInitFailed(msg) => write!(f, "Error loading model: {}", msg),
            ApiError::InferenceFailed(msg) => write!(f, "Inference failed: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, axum::Json(self.to_response(None))).into_response()
    }
}
