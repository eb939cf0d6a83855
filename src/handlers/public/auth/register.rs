use axum::extract::State;

use crate::api::ApiJson;
use crate::app::AppState;
use crate::auth::Registration;
use crate::database::models::UserIdentity;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Role;

/// POST /auth/register - Create a student account
///
/// ```json
/// { "email": "...", "password": "...", "firstName": "...", "lastName": "..." }
/// ```
///
/// Self-registration never grants staff roles; teachers and admins are
/// created through the `siga` CLI or the bootstrap admin.
pub async fn register_post(
    State(state): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> ApiResult<UserIdentity> {
    let user = state.authenticator.register(registration, Role::Student).await?;
    Ok(ApiResponse::created(user.identity()))
}
