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
pub struct AssignTeacherRequest {
    pub teacher_id: Uuid,
}

/// POST /api/courses/:id/teachers - Assign a teacher (admin)
pub async fn teacher_post(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<AssignTeacherRequest>,
) -> ApiResult<CourseView> {
    let course = state
        .catalog
        .assign_teacher(&requester, course_id, body.teacher_id)
        .await?;
    Ok(ApiResponse::success(course))
}

/// DELETE /api/courses/:id/teachers/:teacher_id - Unassign a teacher (admin)
pub async fn teacher_delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath((course_id, teacher_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<CourseView> {
    let course = state
        .catalog
        .remove_teacher(&requester, course_id, teacher_id)
        .await?;
    Ok(ApiResponse::success(course))
}
