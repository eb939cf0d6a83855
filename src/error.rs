// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthError;
use crate::database::models::CourseSummary;
use crate::database::DatabaseError;
use crate::eligibility::GraphError;
use crate::services::{CatalogError, LedgerError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError(String),
    InvalidJson(String),
    /// Business rule violation with a stable code (ALREADY_ENROLLED, CYCLE_DETECTED, ...)
    RuleViolation {
        code: &'static str,
        message: String,
    },
    PrerequisitesNotMet {
        message: String,
        missing: Vec<CourseSummary>,
    },

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError(_) => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::RuleViolation { .. } => 400,
            ApiError::PrerequisitesNotMet { .. } => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError(msg) => msg,
            ApiError::InvalidJson(msg) => msg,
            ApiError::RuleViolation { message, .. } => message,
            ApiError::PrerequisitesNotMet { message, .. } => message,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::PrerequisitesNotMet { missing, .. } = self {
            response["missingPrerequisites"] = json!(missing);
        }

        response
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::RuleViolation { code, .. } => *code,
            ApiError::PrerequisitesNotMet { .. } => "PREREQUISITES_NOT_MET",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        ApiError::ValidationError(message.into())
    }

    pub fn rule(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::RuleViolation {
            code,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert other error types to ApiError
impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ApiError::not_found(msg),
            DatabaseError::Sqlx(sqlx::Error::PoolTimedOut) => {
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            other => {
                // Log the real error but return generic message
                tracing::error!("Storage error: {}", other);
                ApiError::internal_server_error("An error occurred while processing your request")
            }
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let code = match &err {
            GraphError::NotFound(_) => return ApiError::not_found(err.to_string()),
            GraphError::SelfReference(_) => "SELF_REFERENCE",
            GraphError::DuplicateEdge { .. } => "DUPLICATE_EDGE",
            GraphError::CycleDetected { .. } => "CYCLE_DETECTED",
        };
        ApiError::rule(code, err.to_string())
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => ApiError::not_found(err.to_string()),
            CatalogError::Forbidden(msg) => ApiError::forbidden(msg),
            CatalogError::Validation(msg) => ApiError::validation_error(msg),
            CatalogError::TeacherAlreadyAssigned { .. } => {
                ApiError::rule("TEACHER_ALREADY_ASSIGNED", err.to_string())
            }
            CatalogError::CourseInUse(_) => ApiError::rule("COURSE_IN_USE", err.to_string()),
            CatalogError::Graph(e) => e.into(),
            CatalogError::Internal(e) => e.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::CourseNotFound(_)
            | LedgerError::EnrollmentNotFound(_)
            | LedgerError::StudentNotFound(_) => ApiError::not_found(err.to_string()),
            LedgerError::AlreadyEnrolled { .. } => ApiError::rule("ALREADY_ENROLLED", err.to_string()),
            LedgerError::PrerequisitesNotMet { ref missing } => ApiError::PrerequisitesNotMet {
                message: err.to_string(),
                missing: missing.clone(),
            },
            LedgerError::Forbidden(msg) => ApiError::forbidden(msg),
            LedgerError::Validation(msg) => ApiError::validation_error(msg),
            LedgerError::Internal(e) => e.into(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) => {
                ApiError::unauthorized(err.to_string())
            }
            AuthError::EmailTaken(_) => ApiError::rule("EMAIL_TAKEN", err.to_string()),
            AuthError::Validation(msg) => ApiError::validation_error(msg),
            AuthError::MissingSecret | AuthError::Hashing(_) => {
                tracing::error!("Authentication failure: {}", err);
                ApiError::internal_server_error("Authentication is unavailable")
            }
            AuthError::Database(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidJson(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(rejection.body_text())
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
