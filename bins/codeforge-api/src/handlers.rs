// HTTP route handlers for the CodeForge API

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use codeforge_judge::orchestrator;
use codeforge_judge::repo::RedisSubmissionRepo;
use codeforge_judge::EvalError;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::{metrics, AppState};

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub source_code: String,
    pub language: String,
}

/// The authenticated-user context is supplied by the gateway as an
/// x-user-id header; this core only requires that it is present.
fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn error_response(err: &EvalError) -> impl IntoResponse {
    let code = match err {
        EvalError::UnsupportedLanguage { .. } => StatusCode::BAD_REQUEST,
        EvalError::ProblemNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(serde_json::json!({
            "error": err.to_string()
        })),
    )
}

fn missing_identity() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "missing x-user-id header"
        })),
    )
        .into_response()
}

fn empty_source() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "source_code must not be empty"
        })),
    )
        .into_response()
}

async fn load_problem(
    state: &AppState,
    problem_id: &str,
) -> Result<codeforge_common::types::Problem, EvalError> {
    let mut conn = state.redis.clone();
    match codeforge_common::redis::get_problem(&mut conn, problem_id).await {
        Ok(Some(problem)) => Ok(problem),
        Ok(None) => Err(EvalError::ProblemNotFound {
            id: problem_id.to_string(),
        }),
        Err(e) => Err(EvalError::Store(e.to_string())),
    }
}

/// POST /problems/{id}/run - Trial run against visible test cases.
/// Never persisted, never touches the solved set.
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let Some(user_id) = caller_id(&headers) else {
        return missing_identity();
    };
    if payload.source_code.trim().is_empty() {
        return empty_source();
    }

    let problem = match load_problem(&state, &problem_id).await {
        Ok(problem) => problem,
        Err(e) => {
            error!(%user_id, %problem_id, error = %e, "trial run rejected");
            return error_response(&e).into_response();
        }
    };

    let started = Instant::now();
    match orchestrator::run_trial(
        &state.judge,
        &problem,
        &payload.source_code,
        &payload.language,
        &state.config,
    )
    .await
    {
        Ok(report) => {
            metrics::observe_evaluation("trial", &report.status.to_string(), started.elapsed());
            info!(
                %user_id,
                problem_id = %report.problem_id,
                status = %report.status,
                passed = report.test_cases_passed,
                total = report.test_cases_total,
                "trial run finished"
            );
            (StatusCode::OK, Json(report)).into_response()
        }
        Err(e) => {
            error!(%user_id, %problem_id, error = %e, "trial run failed");
            error_response(&e).into_response()
        }
    }
}

/// POST /problems/{id}/submit - Graded submission against hidden test
/// cases; the verdict is persisted and may mark the problem solved.
pub async fn submit_code(
    State(state): State<Arc<AppState>>,
    Path(problem_id): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<EvaluateRequest>,
) -> impl IntoResponse {
    let Some(user_id) = caller_id(&headers) else {
        return missing_identity();
    };
    if payload.source_code.trim().is_empty() {
        return empty_source();
    }

    let problem = match load_problem(&state, &problem_id).await {
        Ok(problem) => problem,
        Err(e) => {
            error!(%user_id, %problem_id, error = %e, "submission rejected");
            return error_response(&e).into_response();
        }
    };

    let repo = RedisSubmissionRepo::new(state.redis.clone());
    let started = Instant::now();
    match orchestrator::submit(
        &state.judge,
        &repo,
        &user_id,
        &problem,
        &payload.source_code,
        &payload.language,
        &state.config,
    )
    .await
    {
        Ok(submission) => {
            metrics::observe_evaluation("graded", &submission.status.to_string(), started.elapsed());
            info!(
                %user_id,
                submission_id = %submission.id,
                status = %submission.status,
                passed = submission.test_cases_passed,
                total = submission.test_cases_total,
                "submission finished"
            );
            (StatusCode::CREATED, Json(submission)).into_response()
        }
        Err(e) => {
            error!(%user_id, %problem_id, error = %e, "submission failed");
            error_response(&e).into_response()
        }
    }
}

/// GET /submissions/{id} - Fetch a persisted submission row
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> impl IntoResponse {
    let submission_uuid = match Uuid::parse_str(&submission_id) {
        Ok(id) => id,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "Invalid submission ID format"
                })),
            )
                .into_response();
        }
    };

    let mut conn = state.redis.clone();
    match codeforge_common::redis::get_submission(&mut conn, &submission_uuid).await {
        Ok(Some(submission)) => (StatusCode::OK, Json(submission)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": "Submission not found"
            })),
        )
            .into_response(),
        Err(e) => {
            error!(%submission_id, error = %e, "failed to fetch submission");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": format!("Failed to fetch submission: {}", e)
                })),
            )
                .into_response()
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn export_metrics() -> impl IntoResponse {
    (StatusCode::OK, metrics::render())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caller_id_requires_nonempty_header() {
        let mut headers = HeaderMap::new();
        assert!(caller_id(&headers).is_none());

        headers.insert("x-user-id", "  ".parse().unwrap());
        assert!(caller_id(&headers).is_none());

        headers.insert("x-user-id", "user-7".parse().unwrap());
        assert_eq!(caller_id(&headers).as_deref(), Some("user-7"));
    }
}
