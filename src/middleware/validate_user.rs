use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::auth::AuthUser;
use crate::app::AppState;
use crate::error::ApiError;
use crate::types::Requester;

/// Middleware that checks the token's user still exists and attaches the
/// `Requester` used by every protected handler. The role comes from the
/// store, so role changes apply without waiting for token expiry.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| ApiError::unauthorized("JWT authentication required before user validation"))?;

    let user = state.store.get_user(auth_user.user_id).await.map_err(|e| {
        tracing::error!("Database error validating user {}: {}", auth_user.user_id, e);
        ApiError::internal_server_error("Failed to validate user")
    })?;

    let Some(user) = user else {
        tracing::warn!("Token for unknown user {} ({})", auth_user.user_id, auth_user.email);
        return Err(ApiError::unauthorized("User no longer exists"));
    };

    if user.role != auth_user.role {
        tracing::debug!(
            "Role of {} changed from {} to {} since token issue",
            user.email, auth_user.role, user.role
        );
    }

    request.extensions_mut().insert(Requester::new(user.id, user.role));
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
