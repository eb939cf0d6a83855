use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::config::CompletionPolicy;
use crate::database::models::Enrollment;
use crate::database::{DatabaseError, Store};

/// Supplies the set of courses a student has completed.
#[async_trait]
pub trait CompletedCourses: Send + Sync {
    async fn completed_courses(&self, student_id: Uuid) -> Result<HashSet<Uuid>, DatabaseError>;
}

impl CompletionPolicy {
    pub fn counts(&self, enrollment: &Enrollment) -> bool {
        if enrollment.completed {
            return true;
        }
        match self {
            CompletionPolicy::Marked => false,
            CompletionPolicy::PassingGrade(threshold) => enrollment
                .average_grade()
                .map_or(false, |avg| avg >= *threshold),
        }
    }
}

/// Derives completed courses from the student's enrollments.
pub struct EnrollmentCompletion {
    store: Arc<dyn Store>,
    policy: CompletionPolicy,
}

impl EnrollmentCompletion {
    pub fn new(store: Arc<dyn Store>, policy: CompletionPolicy) -> Self {
        Self { store, policy }
    }
}

#[async_trait]
impl CompletedCourses for EnrollmentCompletion {
    async fn completed_courses(&self, student_id: Uuid) -> Result<HashSet<Uuid>, DatabaseError> {
        let enrollments = self.store.list_enrollments_by_student(student_id).await?;
        Ok(enrollments
            .iter()
            .filter(|e| self.policy.counts(e))
            .map(|e| e.course_id)
            .collect())
    }
}
