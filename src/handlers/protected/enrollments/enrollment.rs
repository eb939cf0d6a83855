use axum::{extract::State, Extension};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::database::models::Enrollment;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{EnrollmentView, RosterEntry};
use crate::types::Requester;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollRequest {
    pub course_id: Uuid,
}

/// POST /api/enrollments - Enroll the caller in a course
///
/// 400 PREREQUISITES_NOT_MET carries `missingPrerequisites`; 400
/// ALREADY_ENROLLED when the pair exists.
pub async fn enrollment_post(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(body): ApiJson<EnrollRequest>,
) -> ApiResult<Enrollment> {
    let enrollment = state
        .ledger
        .enroll(&requester, requester.id, body.course_id)
        .await?;
    Ok(ApiResponse::created(enrollment))
}

/// GET /api/enrollments/me - Caller's enrollments with course, teachers and classmates
pub async fn me_get(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
) -> ApiResult<Vec<EnrollmentView>> {
    Ok(ApiResponse::success(state.ledger.my_enrollments(&requester).await?))
}

/// GET /api/enrollments/course/:course_id - Roster (course teachers and admins)
pub async fn by_course_get(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(course_id): ApiPath<Uuid>,
) -> ApiResult<Vec<RosterEntry>> {
    Ok(ApiResponse::success(
        state.ledger.enrollments_by_course(&requester, course_id).await?,
    ))
}

/// DELETE /api/enrollments/:id - Unenroll (owner or admin)
pub async fn enrollment_delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.ledger.unenroll(&requester, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
