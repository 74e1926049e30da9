//! HTTP handlers for the REST endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::Uri,
    routing::{get, post},
};
use chrono::Utc;
use contractlens_core::part_number;
use serde_json::Value;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ApiError, ApiResult};
use crate::health::check_databases;
use crate::pipeline::Pipeline;
use crate::responses::{
    AnalyzeResponse, Banner, DetailedHealthResponse, FormatsResponse, HealthResponse, SERVICE_NAME,
    StatusResponse, SystemInfo, VERSION,
};

const PART_NUMBER_FIELD: &str = "partNumber";

/// State shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<ServerConfig>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>, config: ServerConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }

    fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}

/// GET / - service banner
pub async fn root() -> Json<Banner> {
    Json(Banner::current())
}

/// GET /api/health - liveness plus store connectivity
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let pipeline = &state.pipeline;
    let databases = check_databases(pipeline.parts().as_ref(), pipeline.contracts().as_ref()).await;
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
        version: VERSION,
        databases,
        uptime: state.uptime(),
    })
}

/// GET /api/health/detailed - health plus environment and process details
pub async fn health_detailed(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let pipeline = &state.pipeline;
    let databases = check_databases(pipeline.parts().as_ref(), pipeline.contracts().as_ref()).await;
    Json(DetailedHealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
        version: VERSION,
        environment: state.config.environment.as_str(),
        databases,
        system: SystemInfo {
            uptime: state.uptime(),
            platform: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            pid: std::process::id(),
            model: pipeline.engine().generator().model().to_string(),
        },
    })
}

/// POST /api/contracts/analyze - run the full analysis for one part number
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<AnalyzeResponse>> {
    let part_number = parse_analyze_request(&body)?;
    info!(part_number = %part_number, "starting contract analysis");

    let analysis = state
        .pipeline
        .analyze_contract(&part_number)
        .await
        .map_err(|e| ApiError::from_pipeline(e, &part_number, state.config.is_production()))?;

    if let Some(reason) = &analysis.degraded {
        info!(part_number = %part_number, reason = %reason, "returning degraded analysis");
    }
    Ok(Json(AnalyzeResponse {
        success: true,
        part_number,
        timestamp: Utc::now().to_rfc3339(),
        analysis: analysis.result,
    }))
}

/// GET /api/contracts/status/:partNumber - analysis status for a part number
pub async fn status(Path(part_number): Path<String>) -> ApiResult<Json<StatusResponse>> {
    let validation = part_number::validate(&part_number);
    if !validation.is_valid {
        return Err(ApiError::invalid_part_number(validation.message));
    }
    Ok(Json(StatusResponse {
        part_number,
        status: "completed",
        timestamp: Utc::now().to_rfc3339(),
    }))
}

/// GET /api/contracts/formats - accepted part number formats
pub async fn formats() -> Json<FormatsResponse> {
    Json(FormatsResponse::part_numbers())
}

/// Any unmatched route
pub async fn not_found(uri: Uri) -> ApiError {
    let path = uri.path_and_query().map_or(uri.path(), |pq| pq.as_str());
    ApiError::endpoint_not_found(path)
}

/// Check the analyze request body and pull out the part number.
///
/// The part number must already be in canonical `PA-NNNNN` form; no
/// normalisation is applied at this boundary.
fn parse_analyze_request(body: &[u8]) -> Result<String, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|_| ApiError::validation("Request body must be valid JSON", None))?;
    let Value::Object(fields) = value else {
        return Err(ApiError::validation("\"value\" must be of type object", None));
    };

    let part_number = match fields.get(PART_NUMBER_FIELD) {
        None | Some(Value::Null) => {
            return Err(ApiError::validation(
                "Part number is required",
                Some(PART_NUMBER_FIELD),
            ));
        }
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ApiError::validation(
                "\"partNumber\" must be a string",
                Some(PART_NUMBER_FIELD),
            ));
        }
    };
    if part_number.is_empty() {
        return Err(ApiError::validation(
            "\"partNumber\" is not allowed to be empty",
            Some(PART_NUMBER_FIELD),
        ));
    }
    if !part_number::matches_pattern(&part_number) {
        return Err(ApiError::validation(
            "Part number must be in format PA-XXXXX where XXXXX is a 5-digit number",
            Some(PART_NUMBER_FIELD),
        ));
    }
    if let Some(extra) = fields.keys().find(|k| k.as_str() != PART_NUMBER_FIELD) {
        return Err(ApiError::validation(
            format!("\"{extra}\" is not allowed"),
            Some(extra.as_str()),
        ));
    }
    Ok(part_number)
}

/// Create router with all API endpoints
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/health/detailed", get(health_detailed))
        .route("/api/contracts/analyze", post(analyze))
        .route("/api/contracts/status/:partNumber", get(status))
        .route("/api/contracts/formats", get(formats))
        .fallback(not_found)
}
