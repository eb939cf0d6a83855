use axum::extract::State;
use serde::Serialize;

use crate::api::ApiJson;
use crate::app::AppState;
use crate::auth::{generate_jwt, Authenticator, Claims, Credentials};
use crate::config;
use crate::database::models::UserIdentity;
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::Role;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    pub user: UserIdentity,
    pub expires_in: u64,
}

/// POST /auth/login - Exchange email and password for a JWT
///
/// ```json
/// { "email": "ana@siga.edu", "password": "..." }
/// ```
///
/// Unknown email and wrong password both answer 401 with the same message.
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> ApiResult<LoginResponse> {
    let user = state.authenticator.identify(&credentials).await?;

    let expiry_hours = config::config().security.jwt_expiry_hours;
    let token = generate_jwt(&Claims::new(user.id, user.email.clone(), user.role, expiry_hours))?;

    tracing::info!("User {} logged in as {}", user.email, user.role);
    Ok(ApiResponse::success(LoginResponse {
        token,
        role: user.role,
        user: user.identity(),
        expires_in: expiry_hours * 3600,
    }))
}
