//! API error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use contractlens_core::part_number::EXPECTED_FORMAT;
use serde_json::{Map, Value, json};
use thiserror::Error;
use tracing::error;

use crate::pipeline::PipelineError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message shown instead of internal detail in production.
pub const GENERIC_FAILURE: &str = "An error occurred during contract analysis";

const PART_NOT_FOUND_SUGGESTIONS: [&str; 3] = [
    "Verify the part number is correct",
    "Check if the part number exists in the MASTER_FILE table",
    "Ensure the format is PA-XXXXX where XXXXX is a 5-digit number",
];

/// JSON error body: `{error, message, ...details}` with an HTTP status.
#[derive(Debug, Clone, Error)]
#[error("[{status}] {error}: {message}")]
pub struct ApiError {
    pub status: StatusCode,
    /// Short, stable title, e.g. `Part not found`.
    pub error: &'static str,
    pub message: String,
    /// Extra top-level fields such as `partNumber` or `suggestions`.
    pub details: Map<String, Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            error,
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// 400 for a malformed request body.
    pub fn validation(message: impl Into<String>, field: Option<&str>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Validation error", message)
            .with("field", field.map_or(Value::Null, Value::from))
            .with("expectedFormat", EXPECTED_FORMAT)
    }

    /// 400 for a part number the validator rejects.
    pub fn invalid_part_number(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Invalid part number format", message)
            .with("expectedFormat", EXPECTED_FORMAT)
    }

    pub fn endpoint_not_found(path: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "Endpoint not found",
            format!("The requested endpoint {path} does not exist"),
        )
        .with(
            "availableEndpoints",
            json!(["/api/health", "/api/contracts/analyze"]),
        )
    }

    /// Map a pipeline failure for `part_number`, hiding internal detail in production.
    pub fn from_pipeline(err: PipelineError, part_number: &str, production: bool) -> Self {
        let message = err.to_string();
        match err {
            PipelineError::InvalidFormat(_) => Self::invalid_part_number(message),
            PipelineError::PartNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "Part not found", message)
                    .with("partNumber", part_number)
                    .with("suggestions", json!(PART_NOT_FOUND_SUGGESTIONS))
            }
            PipelineError::SupplierNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "Supplier information not found", message)
                    .with("partNumber", part_number)
            }
            PipelineError::ContractsNotFound(supplier) => {
                Self::new(StatusCode::NOT_FOUND, "No contracts found", message)
                    .with("partNumber", part_number)
                    .with("supplier", supplier)
            }
            PipelineError::Upstream(e) => {
                error!(part_number, error = %e, "contract analysis failed");
                if production {
                    return Self::new(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Contract analysis failed",
                        GENERIC_FAILURE,
                    )
                    .with("partNumber", part_number);
                }
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Contract analysis failed", message)
                    .with("partNumber", part_number)
                    .with("details", error_chain(&e))
            }
        }
    }

    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), Value::from(self.error));
        body.insert("message".into(), Value::from(self.message.clone()));
        for (k, v) in &self.details {
            body.insert(k.clone(), v.clone());
        }
        Value::Object(body)
    }
}

/// `err` followed by each of its sources, outermost first.
fn error_chain(err: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push(cause.to_string());
        source = cause.source();
    }
    chain
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body())).into_response()
    }
}
