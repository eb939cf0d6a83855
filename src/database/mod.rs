pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use models::{Course, Enrollment, User, UserIdentity};

/// Looks up display identities for user ids. Unknown ids are left out of
/// the returned map.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserIdentity>, DatabaseError>;
}

/// Persistence for courses, enrollments and users.
///
/// Implementations enforce the invariants that must survive concurrent
/// callers: one enrollment per (student, course), no prerequisite cycles and
/// no deleting a course that still has enrollments.
#[async_trait]
pub trait Store: IdentityResolver {
    async fn health_check(&self) -> Result<(), DatabaseError>;

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError>;
    async fn list_courses(&self) -> Result<Vec<Course>, DatabaseError>;
    async fn create_course(&self, course: &Course) -> Result<(), DatabaseError>;
    /// Persists descriptive fields only. Edges have their own operations.
    async fn save_course(&self, course: &Course) -> Result<(), DatabaseError>;
    /// Fails with `InUse` while enrollments reference the course.
    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Fails with `Duplicate`, `Cycle` or `MissingReference`.
    async fn insert_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<(), DatabaseError>;
    async fn delete_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<bool, DatabaseError>;
    async fn insert_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<(), DatabaseError>;
    async fn delete_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<bool, DatabaseError>;

    async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError>;
    async fn find_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>, DatabaseError>;
    /// Fails with `Duplicate` when the pair is already enrolled.
    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), DatabaseError>;
    /// Persists grades and the completion flag. Returns false if the
    /// enrollment no longer exists.
    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<bool, DatabaseError>;
    async fn delete_enrollment(&self, id: Uuid) -> Result<bool, DatabaseError>;
    async fn list_enrollments_by_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError>;
    async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError>;

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Fails with `Duplicate("email")` for a taken address.
    async fn create_user(&self, user: &User) -> Result<(), DatabaseError>;
}
