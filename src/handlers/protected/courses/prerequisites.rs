use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::CourseView;
use crate::types::Requester;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPrerequisiteRequest {
    pub prereq_id: Uuid,
}

/// POST /api/courses/:id/prerequisites - "course :id requires prereqId"
///
/// Fails with SELF_REFERENCE, DUPLICATE_EDGE or CYCLE_DETECTED (400), or
/// 404 when either course is unknown.
pub async fn prerequisite_post(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AddPrerequisiteRequest>,
) -> ApiResult<CourseView> {
    let course = state
        .catalog
        .add_prerequisite(&requester, course_id, body.prereq_id)
        .await?;
    Ok(ApiResponse::created(course))
}

/// DELETE /api/courses/:id/prerequisites/:prereq_id - Idempotent
pub async fn prerequisite_delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath((course_id, prereq_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<CourseView> {
    let course = state
        .catalog
        .remove_prerequisite(&requester, course_id, prereq_id)
        .await?;
    Ok(ApiResponse::success(course))
}
