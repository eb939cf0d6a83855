use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::models::Enrollment;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Requester;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollStudentRequest {
    pub student_id: Uuid,
}

/// POST /api/courses/:id/students - Enroll a named student (admin)
///
/// Same prerequisite and uniqueness rules as self-enrollment.
pub async fn student_post(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiJson(body): ApiJson<EnrollStudentRequest>,
) -> ApiResult<Enrollment> {
    let enrollment = state
        .ledger
        .enroll(&requester, body.student_id, course_id)
        .await?;
    Ok(ApiResponse::created(enrollment))
}
