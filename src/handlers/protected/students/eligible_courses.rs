use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::ApiPath;
use crate::app::AppState;
use crate::database::models::Course;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Requester;

/// GET /api/students/:id/eligible-courses - Courses the student may enroll in now
pub async fn eligible_courses_get(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(student_id): ApiPath<Uuid>,
) -> ApiResult<Vec<Course>> {
    let courses = state.ledger.eligible_courses(&requester, student_id).await?;
    Ok(ApiResponse::success(courses))
}
