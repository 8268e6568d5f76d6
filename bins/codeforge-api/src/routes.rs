// Route table for the CodeForge API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
        .route("/problems/:problem_id/run", post(handlers::run_code))
        .route("/problems/:problem_id/submit", post(handlers::submit_code))
        .route("/submissions/:submission_id", get(handlers::get_submission))
}
