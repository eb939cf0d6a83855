// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every handler here runs behind jwt_auth_middleware and
// validate_user_middleware and receives the caller as Extension<Requester>.
pub mod auth;
pub mod courses;
pub mod enrollments;
pub mod students;
