use axum::Extension;

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - The authenticated user, as currently stored
pub async fn whoami_get(Extension(user): Extension<User>) -> ApiResult<User> {
    Ok(ApiResponse::success(user))
}
