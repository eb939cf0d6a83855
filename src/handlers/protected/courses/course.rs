use axum::{extract::State, Extension};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath};
use crate::app::AppState;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CourseChanges, CourseView, NewCourse};
use crate::types::Requester;

/// GET /api/courses - All courses with teachers and prerequisites resolved
pub async fn course_list(State(state): State<AppState>) -> ApiResult<Vec<CourseView>> {
    Ok(ApiResponse::success(state.catalog.list().await?))
}

/// POST /api/courses - Create a course (admin)
pub async fn course_post(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiJson(input): ApiJson<NewCourse>,
) -> ApiResult<CourseView> {
    let course = state.catalog.create(&requester, input).await?;
    Ok(ApiResponse::created(course))
}

/// GET /api/courses/:id
pub async fn course_get(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<CourseView> {
    Ok(ApiResponse::success(state.catalog.get(id).await?))
}

/// PUT /api/courses/:id - Partial update of descriptive fields (admin)
pub async fn course_put(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(changes): ApiJson<CourseChanges>,
) -> ApiResult<CourseView> {
    Ok(ApiResponse::success(state.catalog.update(&requester, id, changes).await?))
}

/// DELETE /api/courses/:id - Rejected with COURSE_IN_USE while students are enrolled
pub async fn course_delete(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<Value> {
    state.catalog.delete(&requester, id).await?;
    Ok(ApiResponse::success(json!({ "id": id, "deleted": true })))
}
