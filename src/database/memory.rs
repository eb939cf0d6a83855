//! In-process store used for development and tests.
//!
//! All state lives behind one `RwLock`, so every check-then-write below runs
//! under a single write guard.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::manager::DatabaseError;
use super::models::{Course, Enrollment, User, UserIdentity};
use super::{IdentityResolver, Store};
use crate::eligibility::{CourseGraph, GraphError};

#[derive(Default)]
struct MemoryState {
    graph: CourseGraph,
    enrollments: Vec<Enrollment>,
    users: Vec<User>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityResolver for MemoryStore {
    async fn resolve(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserIdentity>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .map(|u| (u.id, u.identity()))
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        Ok(self.state.read().await.graph.course(id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, DatabaseError> {
        Ok(self.state.read().await.graph.all_courses().to_vec())
    }

    async fn create_course(&self, course: &Course) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if state.graph.contains(course.id) {
            return Err(DatabaseError::Duplicate("course"));
        }
        let mut stored = course.clone();
        stored.prerequisites.clear();
        stored.teachers.clear();
        state.graph.upsert_course(stored);
        Ok(())
    }

    async fn save_course(&self, course: &Course) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        let stored = state
            .graph
            .course_mut(course.id)
            .ok_or_else(|| DatabaseError::NotFound(format!("course {}", course.id)))?;
        stored.title = course.title.clone();
        stored.code = course.code.clone();
        stored.description = course.description.clone();
        stored.classroom = course.classroom.clone();
        stored.schedule = course.schedule.clone();
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        if state.enrollments.iter().any(|e| e.course_id == id) {
            return Err(DatabaseError::InUse("course"));
        }
        Ok(state.graph.remove_course(id).is_some())
    }

    async fn insert_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        state
            .graph
            .add_prerequisite(course_id, prereq_id)
            .map_err(|e| match e {
                GraphError::NotFound(_) => DatabaseError::MissingReference("course"),
                GraphError::DuplicateEdge { .. } => DatabaseError::Duplicate("prerequisite"),
                GraphError::SelfReference(_) | GraphError::CycleDetected { .. } => DatabaseError::Cycle,
            })
    }

    async fn delete_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        Ok(state
            .graph
            .remove_prerequisite(course_id, prereq_id)
            .unwrap_or(false))
    }

    async fn insert_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if !state.users.iter().any(|u| u.id == teacher_id) {
            return Err(DatabaseError::MissingReference("user"));
        }
        let course = state
            .graph
            .course_mut(course_id)
            .ok_or(DatabaseError::MissingReference("course"))?;
        if course.teachers.contains(&teacher_id) {
            return Err(DatabaseError::Duplicate("teacher"));
        }
        course.teachers.push(teacher_id);
        Ok(())
    }

    async fn delete_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(course) = state.graph.course_mut(course_id) else {
            return Ok(false);
        };
        let before = course.teachers.len();
        course.teachers.retain(|t| *t != teacher_id);
        Ok(course.teachers.len() != before)
    }

    async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.enrollments.iter().find(|e| e.id == id).cloned())
    }

    async fn find_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if state
            .enrollments
            .iter()
            .any(|e| e.student_id == enrollment.student_id && e.course_id == enrollment.course_id)
        {
            return Err(DatabaseError::Duplicate("enrollment"));
        }
        if !state.graph.contains(enrollment.course_id) {
            return Err(DatabaseError::MissingReference("course"));
        }
        if !state.users.iter().any(|u| u.id == enrollment.student_id) {
            return Err(DatabaseError::MissingReference("user"));
        }
        state.enrollments.push(enrollment.clone());
        Ok(())
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        match state.enrollments.iter_mut().find(|e| e.id == enrollment.id) {
            Some(stored) => {
                stored.grades = enrollment.grades.clone();
                stored.completed = enrollment.completed;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_enrollment(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        let before = state.enrollments.len();
        state.enrollments.retain(|e| e.id != id);
        Ok(state.enrollments.len() != before)
    }

    async fn list_enrollments_by_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let email = email.trim().to_ascii_lowercase();
        let state = self.state.read().await;
        Ok(state.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        let mut state = self.state.write().await;
        if state.users.iter().any(|u| u.email == user.email) {
            return Err(DatabaseError::Duplicate("email"));
        }
        state.users.push(user.clone());
        Ok(())
    }
}
