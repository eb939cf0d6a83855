use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::models::{Enrollment, Grade};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Requester;

#[derive(Debug, Deserialize)]
pub struct GradesRequest {
    pub grades: Vec<Grade>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionRequest {
    pub completed: bool,
}

/// PUT /api/enrollments/:id/grades - Replace the grade list
///
/// ```json
/// { "grades": [{ "name": "Parcial 1", "value": 85 }] }
/// ```
pub async fn grades_put(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<GradesRequest>,
) -> ApiResult<Enrollment> {
    let enrollment = state.ledger.update_grades(&requester, id, body.grades).await?;
    Ok(ApiResponse::success(enrollment))
}

/// PUT /api/enrollments/:id/completion - Mark or unmark a course as completed
pub async fn completion_put(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<CompletionRequest>,
) -> ApiResult<Enrollment> {
    let enrollment = state.ledger.set_completion(&requester, id, body.completed).await?;
    Ok(ApiResponse::success(enrollment))
}
