//! Axum route handlers for the Generation API.

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::generation::generator::{generate_problems, GenerateRequest, GenerationParams};
use crate::models::problem::ProblemRecord;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// First generated problem, kept for single-problem callers.
    pub problem: Option<ProblemRecord>,
    pub problems: Vec<ProblemRecord>,
}

/// POST /api/generate
///
/// Asks the model for `count` problems and returns them normalized.
pub async fn handle_generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = payload.map_err(|e| {
        debug!("Rejected generation request: {e}");
        AppError::BadRequest
    })?;

    let params = GenerationParams::from(request);
    let problems = generate_problems(state.llm.as_ref(), &params).await?;

    Ok(Json(GenerateResponse {
        problem: problems.first().cloned(),
        problems,
    }))
}
