//! Axum route handlers for the problem collection stored on GitHub.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::github_client::WriteRequest;
use crate::models::problem::ProblemRecord;
use crate::persistence::collection::{parse_collection, serialize_collection, validate_collection};
use crate::state::AppState;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Update problem bank";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemsResponse {
    pub problems: Vec<ProblemRecord>,
    pub sha: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub not_found: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveProblemsRequest {
    pub problems: Vec<ProblemRecord>,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveProblemsResponse {
    pub ok: bool,
    pub sha: String,
}

/// GET /api/problems
///
/// Returns the stored collection and its sha. A missing file answers 404
/// with an empty collection so callers can start one.
pub async fn handle_get_problems(State(state): State<AppState>) -> Result<Response, AppError> {
    let location = state.config.file_location();

    let Some(file) = state.store.fetch(&location).await? else {
        info!("No collection at {} yet", location.path);
        let body = ProblemsResponse {
            problems: Vec::new(),
            sha: None,
            not_found: true,
        };
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    };

    let problems = parse_collection(&file.content);
    Ok(Json(ProblemsResponse {
        problems,
        sha: Some(file.sha),
        not_found: false,
    })
    .into_response())
}

/// POST /api/problems
///
/// Replaces the whole collection, conditioned on the sha the caller read.
/// A stale sha answers with the upstream status and `conflict: true`.
pub async fn handle_save_problems(
    State(state): State<AppState>,
    payload: Result<Json<SaveProblemsRequest>, JsonRejection>,
) -> Result<Json<SaveProblemsResponse>, AppError> {
    let Json(request) = payload.map_err(|e| {
        debug!("Rejected save request: {e}");
        AppError::BadRequest
    })?;

    validate_collection(&request.problems).map_err(AppError::Validation)?;

    let content = serialize_collection(&request.problems)
        .map_err(|e| AppError::Internal(anyhow::Error::new(e)))?;
    let message = request
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_COMMIT_MESSAGE);
    let expected_sha = request.sha.as_deref().filter(|s| !s.trim().is_empty());

    let location = state.config.file_location();
    let sha = state
        .store
        .write(
            &location,
            WriteRequest {
                message,
                content: &content,
                expected_sha,
            },
        )
        .await?;

    info!(
        "Saved {} problems to {} (sha {sha})",
        request.problems.len(),
        location.path
    );
    Ok(Json(SaveProblemsResponse { ok: true, sha }))
}
