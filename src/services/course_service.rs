use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{Course, CourseSummary, Schedule, UserIdentity};
use crate::database::{DatabaseError, Store};
use crate::eligibility::{CourseGraph, GraphError};
use crate::types::{Requester, Role};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("Teacher {teacher} is already assigned to course {course}")]
    TeacherAlreadyAssigned { course: Uuid, teacher: Uuid },
    #[error("Course {0} still has enrollments")]
    CourseInUse(Uuid),
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Internal(#[from] DatabaseError),
}

/// Fields accepted when creating a course
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCourse {
    pub title: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub classroom: Option<String>,
    pub schedule: Option<Schedule>,
}

/// Partial update; absent fields are left as they are
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseChanges {
    pub title: Option<String>,
    pub code: Option<String>,
    pub description: Option<String>,
    pub classroom: Option<String>,
    pub schedule: Option<Schedule>,
}

/// Course as returned to API clients, with teachers and prerequisites resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseView {
    pub id: Uuid,
    pub title: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub classroom: Option<String>,
    pub schedule: Option<Schedule>,
    pub teachers: Vec<UserIdentity>,
    pub prerequisites: Vec<CourseSummary>,
    pub created_at: DateTime<Utc>,
}

impl CourseView {
    pub(crate) fn build(
        course: &Course,
        graph: &CourseGraph,
        identities: &HashMap<Uuid, UserIdentity>,
    ) -> Self {
        Self {
            id: course.id,
            title: course.title.clone(),
            code: course.code.clone(),
            description: course.description.clone(),
            classroom: course.classroom.clone(),
            schedule: course.schedule.clone(),
            teachers: course
                .teachers
                .iter()
                .filter_map(|id| identities.get(id).cloned())
                .collect(),
            prerequisites: course
                .prerequisites
                .iter()
                .filter_map(|id| graph.course(*id).map(Course::summary))
                .collect(),
            created_at: course.created_at,
        }
    }
}

/// Admin-facing course management: descriptive data, teacher assignments
/// and prerequisite edges.
pub struct CourseCatalog {
    store: Arc<dyn Store>,
}

impl CourseCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> Result<Vec<CourseView>, CatalogError> {
        let graph = self.snapshot().await?;
        self.views(&graph, graph.all_courses()).await
    }

    pub async fn get(&self, id: Uuid) -> Result<CourseView, CatalogError> {
        let graph = self.snapshot().await?;
        let course = graph.course(id).ok_or_else(|| course_not_found(id))?;
        let mut views = self.views(&graph, std::slice::from_ref(course)).await?;
        views.pop().ok_or_else(|| course_not_found(id))
    }

    pub async fn create(&self, requester: &Requester, input: NewCourse) -> Result<CourseView, CatalogError> {
        require_admin(requester, "create courses")?;

        let title = validate_title(&input.title)?;
        if let Some(schedule) = &input.schedule {
            validate_schedule(schedule)?;
        }

        let mut course = Course::new(title);
        course.code = non_blank(input.code);
        course.description = non_blank(input.description);
        course.classroom = non_blank(input.classroom);
        course.schedule = input.schedule;

        self.store.create_course(&course).await?;
        info!("Course {} '{}' created by {}", course.id, course.title, requester.id);
        self.get(course.id).await
    }

    pub async fn update(
        &self,
        requester: &Requester,
        id: Uuid,
        changes: CourseChanges,
    ) -> Result<CourseView, CatalogError> {
        let mut course = self.load(id).await?;
        require_admin(requester, "update courses")?;

        if let Some(title) = changes.title {
            course.title = validate_title(&title)?;
        }
        if let Some(schedule) = changes.schedule {
            validate_schedule(&schedule)?;
            course.schedule = Some(schedule);
        }
        if changes.code.is_some() {
            course.code = non_blank(changes.code);
        }
        if changes.description.is_some() {
            course.description = non_blank(changes.description);
        }
        if changes.classroom.is_some() {
            course.classroom = non_blank(changes.classroom);
        }

        self.store.save_course(&course).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => course_not_found(id),
            other => other.into(),
        })?;
        info!("Course {} updated by {}", id, requester.id);
        self.get(id).await
    }

    /// Removes the course with its edges and teacher assignments. Rejected
    /// while any student is enrolled.
    pub async fn delete(&self, requester: &Requester, id: Uuid) -> Result<(), CatalogError> {
        self.load(id).await?;
        require_admin(requester, "delete courses")?;

        match self.store.delete_course(id).await {
            Ok(true) => {
                info!("Course {} deleted by {}", id, requester.id);
                Ok(())
            }
            Ok(false) => Err(course_not_found(id)),
            Err(DatabaseError::InUse(_)) => {
                warn!("Refusing to delete course {}: enrollments exist", id);
                Err(CatalogError::CourseInUse(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn assign_teacher(
        &self,
        requester: &Requester,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<CourseView, CatalogError> {
        let course = self.load(course_id).await?;
        require_admin(requester, "assign teachers")?;

        let user = self
            .store
            .get_user(teacher_id)
            .await?
            .ok_or_else(|| CatalogError::NotFound(format!("User {}", teacher_id)))?;
        if user.role != Role::Teacher {
            return Err(CatalogError::Validation(format!(
                "User {} has role '{}', expected 'teacher'",
                teacher_id, user.role
            )));
        }
        if course.has_teacher(teacher_id) {
            return Err(CatalogError::TeacherAlreadyAssigned { course: course_id, teacher: teacher_id });
        }

        self.store
            .insert_teacher(course_id, teacher_id)
            .await
            .map_err(|e| match e {
                DatabaseError::Duplicate(_) => CatalogError::TeacherAlreadyAssigned {
                    course: course_id,
                    teacher: teacher_id,
                },
                DatabaseError::MissingReference("user") => {
                    CatalogError::NotFound(format!("User {}", teacher_id))
                }
                DatabaseError::MissingReference(_) => course_not_found(course_id),
                other => other.into(),
            })?;
        info!("Teacher {} assigned to course {}", teacher_id, course_id);
        self.get(course_id).await
    }

    /// Idempotent; unassigning a teacher who is not assigned succeeds.
    pub async fn remove_teacher(
        &self,
        requester: &Requester,
        course_id: Uuid,
        teacher_id: Uuid,
    ) -> Result<CourseView, CatalogError> {
        self.load(course_id).await?;
        require_admin(requester, "unassign teachers")?;

        if self.store.delete_teacher(course_id, teacher_id).await? {
            info!("Teacher {} removed from course {}", teacher_id, course_id);
        }
        self.get(course_id).await
    }

    /// Adds "course requires prereq". The edge is validated against a
    /// snapshot for a precise error, and again by the store under its lock.
    pub async fn add_prerequisite(
        &self,
        requester: &Requester,
        course_id: Uuid,
        prereq_id: Uuid,
    ) -> Result<CourseView, CatalogError> {
        let graph = self.snapshot().await?;
        if !graph.contains(course_id) {
            return Err(course_not_found(course_id));
        }
        require_admin(requester, "edit prerequisites")?;

        if let Err(e) = graph.validate_new_edge(course_id, prereq_id) {
            warn!("Rejected prerequisite {} -> {}: {}", course_id, prereq_id, e);
            return Err(e.into());
        }

        self.store
            .insert_prerequisite(course_id, prereq_id)
            .await
            .map_err(|e| match e {
                DatabaseError::Duplicate(_) => CatalogError::Graph(GraphError::DuplicateEdge {
                    course: course_id,
                    prerequisite: prereq_id,
                }),
                DatabaseError::Cycle => CatalogError::Graph(GraphError::CycleDetected {
                    course: course_id,
                    prerequisite: prereq_id,
                }),
                DatabaseError::MissingReference(_) => CatalogError::Graph(GraphError::NotFound(prereq_id)),
                other => CatalogError::Internal(other),
            })?;
        info!("Course {} now requires {}", course_id, prereq_id);
        self.get(course_id).await
    }

    /// Idempotent; removing an absent edge succeeds.
    pub async fn remove_prerequisite(
        &self,
        requester: &Requester,
        course_id: Uuid,
        prereq_id: Uuid,
    ) -> Result<CourseView, CatalogError> {
        self.load(course_id).await?;
        require_admin(requester, "edit prerequisites")?;

        if self.store.delete_prerequisite(course_id, prereq_id).await? {
            info!("Course {} no longer requires {}", course_id, prereq_id);
        }
        self.get(course_id).await
    }

    async fn load(&self, id: Uuid) -> Result<Course, CatalogError> {
        self.store
            .get_course(id)
            .await?
            .ok_or_else(|| course_not_found(id))
    }

    async fn snapshot(&self) -> Result<CourseGraph, CatalogError> {
        Ok(CourseGraph::from_courses(self.store.list_courses().await?))
    }

    async fn views(&self, graph: &CourseGraph, courses: &[Course]) -> Result<Vec<CourseView>, CatalogError> {
        let mut teacher_ids: Vec<Uuid> = courses.iter().flat_map(|c| c.teachers.iter().copied()).collect();
        teacher_ids.sort();
        teacher_ids.dedup();
        let identities = self.store.resolve(&teacher_ids).await?;

        Ok(courses
            .iter()
            .map(|c| CourseView::build(c, graph, &identities))
            .collect())
    }
}

fn course_not_found(id: Uuid) -> CatalogError {
    CatalogError::NotFound(format!("Course {}", id))
}

fn require_admin(requester: &Requester, action: &str) -> Result<(), CatalogError> {
    if requester.is_admin() {
        Ok(())
    } else {
        Err(CatalogError::Forbidden(format!("Only admins can {}", action)))
    }
}

fn validate_title(title: &str) -> Result<String, CatalogError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CatalogError::Validation("Course title is required".to_string()));
    }
    Ok(title.to_string())
}

fn validate_schedule(schedule: &Schedule) -> Result<(), CatalogError> {
    if [&schedule.day, &schedule.start_time, &schedule.end_time]
        .iter()
        .any(|s| s.trim().is_empty())
    {
        return Err(CatalogError::Validation(
            "Schedule requires day, startTime and endTime".to_string(),
        ));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
