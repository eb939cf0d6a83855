use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::StoreAuthenticator;
use crate::config::{self, CompletionPolicy, SecurityConfig};
use crate::database::Store;
use crate::handlers::{protected, public};
use crate::middleware::{jwt_auth_middleware, validate_user_middleware};
use crate::services::{CourseCatalog, EnrollmentCompletion, EnrollmentLedger};

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub catalog: Arc<CourseCatalog>,
    pub ledger: Arc<EnrollmentLedger>,
    pub authenticator: Arc<StoreAuthenticator>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, policy: CompletionPolicy) -> Self {
        let completion = Arc::new(EnrollmentCompletion::new(store.clone(), policy));
        Self {
            catalog: Arc::new(CourseCatalog::new(store.clone())),
            ledger: Arc::new(EnrollmentLedger::new(store.clone(), completion)),
            authenticator: Arc::new(StoreAuthenticator::new(store.clone())),
            store,
        }
    }
}

pub fn app(state: AppState) -> Router {
    let api = config::config();

    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Protected
        .merge(protected_routes(state.clone()))
        .layer(DefaultBodyLimit::max(api.api.max_request_size_bytes));

    if api.security.enable_cors {
        router = router.layer(cors_layer(&api.security));
    }
    if api.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router.with_state(state)
}

fn auth_public_routes() -> Router<AppState> {
    use public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
}

fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(course_routes())
        .merge(enrollment_routes())
        .merge(student_routes())
        // route_layer: unmatched paths still 404 instead of 401
        .route_layer(middleware::from_fn_with_state(state, validate_user_middleware))
        .route_layer(middleware::from_fn(jwt_auth_middleware))
}

fn auth_routes() -> Router<AppState> {
    use protected::auth;

    Router::new().route("/api/auth/whoami", get(auth::whoami_get))
}

fn course_routes() -> Router<AppState> {
    use protected::courses;

    Router::new()
        .route("/api/courses", get(courses::course_list).post(courses::course_post))
        .route(
            "/api/courses/:id",
            get(courses::course_get)
                .put(courses::course_put)
                .delete(courses::course_delete),
        )
        .route("/api/courses/:id/teachers", post(courses::teacher_post))
        .route("/api/courses/:id/teachers/:teacher_id", delete(courses::teacher_delete))
        .route("/api/courses/:id/prerequisites", post(courses::prerequisite_post))
        .route(
            "/api/courses/:id/prerequisites/:prereq_id",
            delete(courses::prerequisite_delete),
        )
        .route("/api/courses/:id/eligibility", get(courses::eligibility_get))
        .route("/api/courses/:id/students", post(courses::student_post))
}

fn enrollment_routes() -> Router<AppState> {
    use protected::enrollments;

    Router::new()
        .route("/api/enrollments", post(enrollments::enrollment_post))
        .route("/api/enrollments/me", get(enrollments::me_get))
        .route("/api/enrollments/course/:course_id", get(enrollments::by_course_get))
        .route("/api/enrollments/:id", delete(enrollments::enrollment_delete))
        .route("/api/enrollments/:id/grades", put(enrollments::grades_put))
        .route("/api/enrollments/:id/completion", put(enrollments::completion_put))
}

fn student_routes() -> Router<AppState> {
    use protected::students;

    Router::new().route(
        "/api/students/:id/eligible-courses",
        get(students::eligible_courses_get),
    )
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "SIGA API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Courses, prerequisites and enrollments",
            "endpoints": {
                "public_auth": "/auth/register, /auth/login",
                "auth": "/api/auth/whoami",
                "courses": "/api/courses[/:id[/teachers|/prerequisites|/eligibility|/students]]",
                "enrollments": "/api/enrollments[/me|/course/:course_id|/:id[/grades|/completion]]",
                "students": "/api/students/:id/eligible-courses",
            }
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "store": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "store unavailable",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now
                    }
                })),
            )
        }
    }
}
