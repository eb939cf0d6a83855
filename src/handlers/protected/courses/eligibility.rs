use axum::{extract::State, Extension};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::{ApiPath, ApiQuery};
use crate::app::AppState;
use crate::eligibility::Decision;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Requester;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EligibilityQuery {
    /// Defaults to the caller. Staff may ask about any student.
    pub student_id: Option<Uuid>,
}

/// GET /api/courses/:id/eligibility[?studentId=]
///
/// `{"status":"eligible"}` or
/// `{"status":"ineligible","missingPrerequisites":[...]}`
pub async fn eligibility_get(
    State(state): State<AppState>,
    Extension(requester): Extension<Requester>,
    ApiPath(course_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<EligibilityQuery>,
) -> ApiResult<Decision> {
    let student_id = query.student_id.unwrap_or(requester.id);
    let decision = state
        .ledger
        .check_eligibility(&requester, student_id, course_id)
        .await?;
    Ok(ApiResponse::success(decision))
}
