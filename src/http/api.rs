//! REST API handlers
//!
//! Routes, request/response types and the mapping from crate errors to
//! HTTP status codes.

use std::time::Instant;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::{AssignmentOutcome, StoredAssignment};
use crate::planner::{PlanRequest, PlannedDay};
use crate::scheduler::{parse_time, Violation};

use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
        }
    }
}

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    /// Empty pool, set for 422 responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool: Option<String>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            pool: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Body of `POST /api/plans`
#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub day: NaiveDate,
    #[serde(default)]
    pub count: Option<usize>,
    /// `HH:MM`
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

/// Body of `POST /api/assignments/{id}/outcome`
#[derive(Debug, Deserialize)]
pub struct OutcomeRequest {
    pub outcome: String,
}

/// Stored assignments of one day
#[derive(Debug, Serialize)]
pub struct DayResponse {
    pub day: NaiveDate,
    pub assignments: Vec<StoredAssignment>,
}

/// Audit result of one day
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub day: NaiveDate,
    pub violations: Vec<Violation>,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/plans", post(create_plan))
        .route("/api/plans/{day}", get(get_plan))
        .route("/api/plans/{day}/verify", get(verify_plan))
        .route("/api/assignments/{id}/outcome", post(record_outcome))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ============================================================================
// Error Mapping
// ============================================================================

fn error_response(err: &Error) -> (StatusCode, ErrorResponse) {
    if let Some(scheduler) = err.as_scheduler() {
        if let Some(pool) = scheduler.empty_pool() {
            let mut body = ErrorResponse::new(err.to_string());
            body.pool = Some(pool.id().to_string());
            return (StatusCode::UNPROCESSABLE_ENTITY, body);
        }
        if scheduler.is_caller_error() {
            return (StatusCode::BAD_REQUEST, ErrorResponse::new(err.to_string()));
        }
    }

    tracing::error!(error = %err, "Request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorResponse::new(err.to_string()),
    )
}

fn observe(endpoint: &str, status: StatusCode, started: Instant) {
    crate::metrics::record_api_request(
        endpoint,
        status.as_u16(),
        started.elapsed().as_secs_f64(),
    );
}

fn parse_day(raw: &str) -> Result<NaiveDate, (StatusCode, ErrorResponse)> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::new(format!("Invalid date format: {}. Expected YYYY-MM-DD", raw)),
        )
    })
}

/// Run blocking repository work off the async runtime
async fn blocking<T, F>(f: F) -> Result<T, Error>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, Error> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::with_source("blocking task failed", e))?
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    }))
}

/// Generate (and store) the plan for one day
async fn create_plan(
    State(state): State<AppState>,
    Json(request): Json<CreatePlanRequest>,
) -> Response {
    let started = Instant::now();

    let start_time = match request.start_time.as_deref().map(parse_time).transpose() {
        Ok(t) => t,
        Err(e) => {
            observe("/api/plans", StatusCode::BAD_REQUEST, started);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
                .into_response();
        }
    };

    let count = request
        .count
        .unwrap_or(state.service.config().planner.default_count);
    let plan_request = PlanRequest::new(request.day, count)
        .starting_at(start_time)
        .dry_run(request.dry_run);

    let service = state.service.clone();
    let result: Result<PlannedDay, Error> =
        blocking(move || service.plan_day(&plan_request)).await;

    match result {
        Ok(planned) => {
            let status = if request.dry_run {
                StatusCode::OK
            } else {
                StatusCode::CREATED
            };
            observe("/api/plans", status, started);
            (status, Json(ApiResponse::success(planned))).into_response()
        }
        Err(e) => {
            let (status, body) = error_response(&e);
            observe("/api/plans", status, started);
            (status, Json(body)).into_response()
        }
    }
}

/// Stored assignments of a day
async fn get_plan(State(state): State<AppState>, Path(day): Path<String>) -> Response {
    let started = Instant::now();
    let day = match parse_day(&day) {
        Ok(d) => d,
        Err((status, body)) => {
            observe("/api/plans/{day}", status, started);
            return (status, Json(body)).into_response();
        }
    };

    let service = state.service.clone();
    match blocking(move || service.assignments_for(day)).await {
        Ok(assignments) => {
            observe("/api/plans/{day}", StatusCode::OK, started);
            Json(ApiResponse::success(DayResponse { day, assignments })).into_response()
        }
        Err(e) => {
            let (status, body) = error_response(&e);
            observe("/api/plans/{day}", status, started);
            (status, Json(body)).into_response()
        }
    }
}

/// Audit the stored assignments of a day
async fn verify_plan(State(state): State<AppState>, Path(day): Path<String>) -> Response {
    let started = Instant::now();
    let day = match parse_day(&day) {
        Ok(d) => d,
        Err((status, body)) => {
            observe("/api/plans/{day}/verify", status, started);
            return (status, Json(body)).into_response();
        }
    };

    let service = state.service.clone();
    match blocking(move || service.verify_day(day)).await {
        Ok(violations) => {
            observe("/api/plans/{day}/verify", StatusCode::OK, started);
            Json(ApiResponse::success(VerifyResponse { day, violations })).into_response()
        }
        Err(e) => {
            let (status, body) = error_response(&e);
            observe("/api/plans/{day}/verify", status, started);
            (status, Json(body)).into_response()
        }
    }
}

/// Record the real-world outcome of a stored assignment
async fn record_outcome(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<OutcomeRequest>,
) -> Response {
    let started = Instant::now();
    let endpoint = "/api/assignments/{id}/outcome";

    let outcome: AssignmentOutcome = match request.outcome.parse() {
        Ok(o) => o,
        Err(e) => {
            observe(endpoint, StatusCode::BAD_REQUEST, started);
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e))).into_response();
        }
    };

    let service = state.service.clone();
    let lookup = id.clone();
    match blocking(move || service.record_outcome(&lookup, outcome)).await {
        Ok(true) => {
            observe(endpoint, StatusCode::OK, started);
            (
                StatusCode::OK,
                Json(ApiResponse::success(format!("{} marked {}", id, outcome))),
            )
                .into_response()
        }
        Ok(false) => {
            observe(endpoint, StatusCode::NOT_FOUND, started);
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Assignment not found: {}", id))),
            )
                .into_response()
        }
        Err(e) => {
            let (status, body) = error_response(&e);
            observe(endpoint, status, started);
            (status, Json(body)).into_response()
        }
    }
}

/// Prometheus text exposition
async fn metrics() -> Response {
    match crate::metrics::encode_metrics() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string())),
        )
            .into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::{PoolKind, SchedulerError};

    #[test]
    fn test_api_response_success() {
        let response = ApiResponse::success("test data");
        assert!(response.success);
        assert!(response.data.is_some());
    }

    #[test]
    fn test_insufficient_pool_maps_to_422() {
        let err = Error::from(SchedulerError::insufficient_pool(PoolKind::Texts));
        let (status, body) = error_response(&err);
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.pool.as_deref(), Some("texts"));
    }

    #[test]
    fn test_invalid_time_maps_to_400() {
        let err = Error::from(SchedulerError::InvalidTime {
            value: "xx".into(),
        });
        let (status, _) = error_response(&err);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_storage_error_maps_to_500() {
        let err = Error::config("broken");
        let (status, body) = error_response(&err);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.pool.is_none());
    }

    #[test]
    fn test_parse_day() {
        assert!(parse_day("2024-03-04").is_ok());
        let (status, _) = parse_day("03/04/2024").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
