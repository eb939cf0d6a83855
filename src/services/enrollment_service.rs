use std::collections::HashSet;
use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use super::completion::CompletedCourses;
use super::course_service::CourseView;
use crate::database::models::{Course, CourseSummary, Enrollment, Grade, UserIdentity};
use crate::database::{DatabaseError, Store};
use crate::eligibility::{CourseGraph, Decision, EligibilityEngine, GraphError};
use crate::types::{Requester, Role};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Course {0} not found")]
    CourseNotFound(Uuid),
    #[error("Enrollment {0} not found")]
    EnrollmentNotFound(Uuid),
    #[error("Student {0} not found")]
    StudentNotFound(Uuid),
    #[error("Student {student} is already enrolled in course {course}")]
    AlreadyEnrolled { student: Uuid, course: Uuid },
    #[error("Missing prerequisites: {}", titles(.missing))]
    PrerequisitesNotMet { missing: Vec<CourseSummary> },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] DatabaseError),
}

fn titles(courses: &[CourseSummary]) -> String {
    courses
        .iter()
        .map(|c| c.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A student's enrollment together with its course and classmates
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub course: CourseView,
    pub classmates: Vec<UserIdentity>,
}

/// Enrollment listed for a course roster
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(flatten)]
    pub enrollment: Enrollment,
    pub student: Option<UserIdentity>,
}

/// Records who takes which course, gated by prerequisites and role rules.
pub struct EnrollmentLedger {
    store: Arc<dyn Store>,
    completion: Arc<dyn CompletedCourses>,
}

impl EnrollmentLedger {
    pub fn new(store: Arc<dyn Store>, completion: Arc<dyn CompletedCourses>) -> Self {
        Self { store, completion }
    }

    /// Enrolls `student_id` in `course_id`. Students may only enroll
    /// themselves; admins may enroll anyone.
    pub async fn enroll(
        &self,
        requester: &Requester,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Enrollment, LedgerError> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(LedgerError::CourseNotFound(course_id));
        }
        let student = self
            .store
            .get_user(student_id)
            .await?
            .ok_or(LedgerError::StudentNotFound(student_id))?;
        if requester.id != student_id && !requester.is_admin() {
            return Err(LedgerError::Forbidden(
                "Only admins can enroll other students".to_string(),
            ));
        }
        if student.role != Role::Student {
            return Err(LedgerError::Validation(format!(
                "Only students can enroll; {} is a {}",
                student.email, student.role
            )));
        }
        if self.store.find_enrollment(student_id, course_id).await?.is_some() {
            return Err(LedgerError::AlreadyEnrolled { student: student_id, course: course_id });
        }

        if let Decision::Ineligible { missing_prerequisites } = self.decide(student_id, course_id).await? {
            warn!(
                "Student {} blocked from course {}: {} prerequisite(s) missing",
                student_id,
                course_id,
                missing_prerequisites.len()
            );
            return Err(LedgerError::PrerequisitesNotMet { missing: missing_prerequisites });
        }

        let enrollment = Enrollment::new(student_id, course_id);
        self.store
            .create_enrollment(&enrollment)
            .await
            .map_err(|e| match e {
                DatabaseError::Duplicate(_) => LedgerError::AlreadyEnrolled {
                    student: student_id,
                    course: course_id,
                },
                DatabaseError::MissingReference("user") => LedgerError::StudentNotFound(student_id),
                DatabaseError::MissingReference(_) => LedgerError::CourseNotFound(course_id),
                other => LedgerError::Internal(other),
            })?;

        info!("Student {} enrolled in course {}", student_id, course_id);
        Ok(enrollment)
    }

    /// Hard delete. Grades recorded on the enrollment are lost.
    pub async fn unenroll(&self, requester: &Requester, enrollment_id: Uuid) -> Result<(), LedgerError> {
        let enrollment = self.load(enrollment_id).await?;
        if enrollment.student_id != requester.id && !requester.is_admin() {
            return Err(LedgerError::Forbidden(
                "Only the enrolled student or an admin can unenroll".to_string(),
            ));
        }
        if !self.store.delete_enrollment(enrollment_id).await? {
            return Err(LedgerError::EnrollmentNotFound(enrollment_id));
        }
        info!(
            "Enrollment {} removed (student {}, course {})",
            enrollment_id, enrollment.student_id, enrollment.course_id
        );
        Ok(())
    }

    /// Replaces the whole grade list.
    pub async fn update_grades(
        &self,
        requester: &Requester,
        enrollment_id: Uuid,
        grades: Vec<Grade>,
    ) -> Result<Enrollment, LedgerError> {
        let mut enrollment = self.load(enrollment_id).await?;
        self.authorize_grading(requester, &enrollment).await?;

        for grade in &grades {
            if grade.name.trim().is_empty() {
                return Err(LedgerError::Validation("Grade name is required".to_string()));
            }
            if !grade.value.is_finite() {
                return Err(LedgerError::Validation(format!(
                    "Grade '{}' has an invalid value",
                    grade.name
                )));
            }
        }

        enrollment.grades = grades;
        self.save(&enrollment).await?;
        info!(
            "Grades updated on enrollment {} by {} ({} entries)",
            enrollment_id,
            requester.id,
            enrollment.grades.len()
        );
        Ok(enrollment)
    }

    pub async fn set_completion(
        &self,
        requester: &Requester,
        enrollment_id: Uuid,
        completed: bool,
    ) -> Result<Enrollment, LedgerError> {
        let mut enrollment = self.load(enrollment_id).await?;
        self.authorize_grading(requester, &enrollment).await?;

        enrollment.completed = completed;
        self.save(&enrollment).await?;
        info!(
            "Enrollment {} marked {} by {}",
            enrollment_id,
            if completed { "completed" } else { "not completed" },
            requester.id
        );
        Ok(enrollment)
    }

    /// The requester's enrollments with course details and classmates.
    pub async fn my_enrollments(&self, requester: &Requester) -> Result<Vec<EnrollmentView>, LedgerError> {
        let enrollments = self.store.list_enrollments_by_student(requester.id).await?;
        if enrollments.is_empty() {
            return Ok(Vec::new());
        }

        let graph = self.snapshot().await?;
        let rosters = try_join_all(
            enrollments
                .iter()
                .map(|e| self.store.list_enrollments_by_course(e.course_id)),
        )
        .await?;

        let mut user_ids: HashSet<Uuid> = HashSet::new();
        for (enrollment, roster) in enrollments.iter().zip(&rosters) {
            if let Some(course) = graph.course(enrollment.course_id) {
                user_ids.extend(course.teachers.iter().copied());
            }
            user_ids.extend(roster.iter().map(|e| e.student_id));
        }
        let identities = self.store.resolve(&user_ids.into_iter().collect::<Vec<_>>()).await?;

        Ok(enrollments
            .into_iter()
            .zip(rosters)
            .filter_map(|(enrollment, roster)| {
                let course = graph.course(enrollment.course_id)?;
                let classmates = roster
                    .iter()
                    .filter(|e| e.student_id != requester.id)
                    .filter_map(|e| identities.get(&e.student_id).cloned())
                    .collect();
                Some(EnrollmentView {
                    course: CourseView::build(course, &graph, &identities),
                    enrollment,
                    classmates,
                })
            })
            .collect())
    }

    /// Roster of a course, visible to its teachers and to admins.
    pub async fn enrollments_by_course(
        &self,
        requester: &Requester,
        course_id: Uuid,
    ) -> Result<Vec<RosterEntry>, LedgerError> {
        let course = self
            .store
            .get_course(course_id)
            .await?
            .ok_or(LedgerError::CourseNotFound(course_id))?;
        if !requester.is_admin() && !course.has_teacher(requester.id) {
            return Err(LedgerError::Forbidden(
                "Only the course's teachers or an admin can list its enrollments".to_string(),
            ));
        }

        let enrollments = self.store.list_enrollments_by_course(course_id).await?;
        let student_ids: Vec<Uuid> = enrollments.iter().map(|e| e.student_id).collect();
        let mut identities = self.store.resolve(&student_ids).await?;

        Ok(enrollments
            .into_iter()
            .map(|enrollment| RosterEntry {
                student: identities.remove(&enrollment.student_id),
                enrollment,
            })
            .collect())
    }

    pub async fn check_eligibility(
        &self,
        requester: &Requester,
        student_id: Uuid,
        course_id: Uuid,
    ) -> Result<Decision, LedgerError> {
        if self.store.get_course(course_id).await?.is_none() {
            return Err(LedgerError::CourseNotFound(course_id));
        }
        self.authorize_view(requester, student_id).await?;
        self.decide(student_id, course_id).await
    }

    /// Every course the student could enroll in right now, in catalog order.
    /// Completed and already-enrolled courses are not filtered out.
    pub async fn eligible_courses(
        &self,
        requester: &Requester,
        student_id: Uuid,
    ) -> Result<Vec<Course>, LedgerError> {
        self.authorize_view(requester, student_id).await?;

        let completed = self.completion.completed_courses(student_id).await?;
        let graph = self.snapshot().await?;
        Ok(EligibilityEngine::new(&graph)
            .eligible_courses(&completed)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn decide(&self, student_id: Uuid, course_id: Uuid) -> Result<Decision, LedgerError> {
        let completed = self.completion.completed_courses(student_id).await?;
        let graph = self.snapshot().await?;
        EligibilityEngine::new(&graph)
            .check(course_id, &completed)
            .map_err(|e| match e {
                GraphError::NotFound(id) => LedgerError::CourseNotFound(id),
                other => LedgerError::Validation(other.to_string()),
            })
    }

    async fn authorize_view(&self, requester: &Requester, student_id: Uuid) -> Result<(), LedgerError> {
        if self.store.get_user(student_id).await?.is_none() {
            return Err(LedgerError::StudentNotFound(student_id));
        }
        if !requester.is_self_or_staff(student_id) {
            return Err(LedgerError::Forbidden(
                "Students can only view their own eligibility".to_string(),
            ));
        }
        Ok(())
    }

    async fn authorize_grading(&self, requester: &Requester, enrollment: &Enrollment) -> Result<(), LedgerError> {
        if requester.is_admin() {
            return Ok(());
        }
        let course = self
            .store
            .get_course(enrollment.course_id)
            .await?
            .ok_or(LedgerError::CourseNotFound(enrollment.course_id))?;
        if !course.has_teacher(requester.id) {
            return Err(LedgerError::Forbidden(
                "Only a teacher of this course or an admin can grade it".to_string(),
            ));
        }
        Ok(())
    }

    async fn load(&self, id: Uuid) -> Result<Enrollment, LedgerError> {
        self.store
            .get_enrollment(id)
            .await?
            .ok_or(LedgerError::EnrollmentNotFound(id))
    }

    async fn save(&self, enrollment: &Enrollment) -> Result<(), LedgerError> {
        if self.store.save_enrollment(enrollment).await? {
            Ok(())
        } else {
            Err(LedgerError::EnrollmentNotFound(enrollment.id))
        }
    }

    async fn snapshot(&self) -> Result<CourseGraph, LedgerError> {
        Ok(CourseGraph::from_courses(self.store.list_courses().await?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompletionPolicy;
    use crate::database::models::NewUser;
    use crate::database::MemoryStore;
    use crate::services::completion::EnrollmentCompletion;

    struct Fixture {
        store: Arc<MemoryStore>,
        ledger: Arc<EnrollmentLedger>,
        admin: Requester,
    }

    fn fixture_with(policy: CompletionPolicy) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let completion = Arc::new(EnrollmentCompletion::new(store.clone(), policy));
        Fixture {
            ledger: Arc::new(EnrollmentLedger::new(store.clone(), completion)),
            store,
            admin: Requester::new(Uuid::new_v4(), Role::Admin),
        }
    }

    fn fixture() -> Fixture {
        fixture_with(CompletionPolicy::Marked)
    }

    async fn user(store: &MemoryStore, name: &str, role: Role) -> Requester {
        let user = NewUser {
            email: format!("{}@siga.test", name),
            first_name: name.into(),
            last_name: "Test".into(),
            password_hash: String::new(),
            role,
        }
        .into_user();
        store.create_user(&user).await.unwrap();
        Requester::new(user.id, role)
    }

    async fn course(store: &MemoryStore, title: &str) -> Uuid {
        let course = Course::new(title);
        store.create_course(&course).await.unwrap();
        course.id
    }

    #[tokio::test]
    async fn prerequisites_gate_enrollment() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let a = course(&f.store, "A").await;
        let b = course(&f.store, "B").await;
        f.store.insert_prerequisite(b, a).await.unwrap();

        match f.ledger.enroll(&ana, ana.id, b).await {
            Err(LedgerError::PrerequisitesNotMet { missing }) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].id, a);
            }
            other => panic!("expected PrerequisitesNotMet, got {:?}", other),
        }

        let first = f.ledger.enroll(&ana, ana.id, a).await.unwrap();
        f.ledger.set_completion(&f.admin, first.id, true).await.unwrap();

        let second = f.ledger.enroll(&ana, ana.id, b).await.unwrap();
        assert!(second.grades.is_empty());
        assert!(!second.completed);
    }

    #[tokio::test]
    async fn double_enroll_is_rejected() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let a = course(&f.store, "A").await;

        f.ledger.enroll(&ana, ana.id, a).await.unwrap();
        assert!(matches!(
            f.ledger.enroll(&ana, ana.id, a).await,
            Err(LedgerError::AlreadyEnrolled { .. })
        ));
        assert_eq!(f.store.list_enrollments_by_course(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_enrolls_produce_one_record() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let a = course(&f.store, "A").await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = f.ledger.clone();
                tokio::spawn(async move { ledger.enroll(&ana, ana.id, a).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(LedgerError::AlreadyEnrolled { .. }) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(f.store.list_enrollments_by_course(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn students_cannot_enroll_others() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let luis = user(&f.store, "luis", Role::Student).await;
        let a = course(&f.store, "A").await;

        assert!(matches!(
            f.ledger.enroll(&ana, luis.id, a).await,
            Err(LedgerError::Forbidden(_))
        ));
        f.ledger.enroll(&f.admin, luis.id, a).await.unwrap();
        assert!(matches!(
            f.ledger.enroll(&ana, ana.id, Uuid::new_v4()).await,
            Err(LedgerError::CourseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn only_students_can_be_enrolled() {
        let f = fixture();
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let a = course(&f.store, "A").await;
        f.store.insert_teacher(a, teacher.id).await.unwrap();

        assert!(matches!(
            f.ledger.enroll(&teacher, teacher.id, a).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            f.ledger.enroll(&f.admin, teacher.id, a).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(f.store.list_enrollments_by_course(a).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn own_teacher_entry_survives_in_my_enrollments() {
        let f = fixture();
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let ana = user(&f.store, "ana", Role::Student).await;
        let a = course(&f.store, "A").await;
        f.store.insert_teacher(a, teacher.id).await.unwrap();
        // written straight to the store, bypassing the ledger's role check
        f.store.create_enrollment(&Enrollment::new(teacher.id, a)).await.unwrap();
        f.ledger.enroll(&ana, ana.id, a).await.unwrap();

        let views = f.ledger.my_enrollments(&teacher).await.unwrap();
        assert_eq!(views.len(), 1);
        let teachers: Vec<Uuid> = views[0].course.teachers.iter().map(|t| t.id).collect();
        assert_eq!(teachers, vec![teacher.id]);
        let classmates: Vec<Uuid> = views[0].classmates.iter().map(|c| c.id).collect();
        assert_eq!(classmates, vec![ana.id]);
    }

    #[tokio::test]
    async fn only_course_teachers_grade() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let stranger = user(&f.store, "other", Role::Teacher).await;
        let a = course(&f.store, "A").await;
        f.store.insert_teacher(a, teacher.id).await.unwrap();
        let enrollment = f.ledger.enroll(&ana, ana.id, a).await.unwrap();

        let grades = vec![Grade::new("Parcial 1", 80.0)];
        assert!(matches!(
            f.ledger.update_grades(&stranger, enrollment.id, grades.clone()).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(matches!(
            f.ledger.update_grades(&ana, enrollment.id, grades.clone()).await,
            Err(LedgerError::Forbidden(_))
        ));
        let stored = f.store.get_enrollment(enrollment.id).await.unwrap().unwrap();
        assert!(stored.grades.is_empty());

        let updated = f.ledger.update_grades(&teacher, enrollment.id, grades).await.unwrap();
        assert_eq!(updated.grades, vec![Grade::new("Parcial 1", 80.0)]);

        assert!(matches!(
            f.ledger
                .update_grades(&teacher, enrollment.id, vec![Grade::new(" ", 10.0)])
                .await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            f.ledger
                .update_grades(&teacher, enrollment.id, vec![Grade::new("Final", f64::NAN)])
                .await,
            Err(LedgerError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn unenroll_removes_the_course_from_my_enrollments() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let luis = user(&f.store, "luis", Role::Student).await;
        let a = course(&f.store, "A").await;
        let enrollment = f.ledger.enroll(&ana, ana.id, a).await.unwrap();

        assert!(matches!(
            f.ledger.unenroll(&luis, enrollment.id).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert_eq!(f.ledger.my_enrollments(&ana).await.unwrap().len(), 1);

        f.ledger.unenroll(&ana, enrollment.id).await.unwrap();
        assert!(f.ledger.my_enrollments(&ana).await.unwrap().is_empty());
        assert!(matches!(
            f.ledger.unenroll(&ana, enrollment.id).await,
            Err(LedgerError::EnrollmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn my_enrollments_lists_classmates_and_teachers() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let luis = user(&f.store, "luis", Role::Student).await;
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let a = course(&f.store, "A").await;
        f.store.insert_teacher(a, teacher.id).await.unwrap();
        f.ledger.enroll(&ana, ana.id, a).await.unwrap();
        f.ledger.enroll(&luis, luis.id, a).await.unwrap();

        let views = f.ledger.my_enrollments(&ana).await.unwrap();
        assert_eq!(views.len(), 1);
        let view = &views[0];
        assert_eq!(view.course.id, a);
        assert_eq!(view.course.teachers.len(), 1);
        assert_eq!(view.course.teachers[0].id, teacher.id);
        assert_eq!(view.classmates.len(), 1);
        assert_eq!(view.classmates[0].id, luis.id);
    }

    #[tokio::test]
    async fn roster_is_limited_to_course_staff() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let a = course(&f.store, "A").await;
        f.store.insert_teacher(a, teacher.id).await.unwrap();
        f.ledger.enroll(&ana, ana.id, a).await.unwrap();

        assert!(matches!(
            f.ledger.enrollments_by_course(&ana, a).await,
            Err(LedgerError::Forbidden(_))
        ));
        let roster = f.ledger.enrollments_by_course(&teacher, a).await.unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].student.as_ref().map(|s| s.id), Some(ana.id));
        assert_eq!(f.ledger.enrollments_by_course(&f.admin, a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn eligibility_is_private_to_self_and_staff() {
        let f = fixture();
        let ana = user(&f.store, "ana", Role::Student).await;
        let luis = user(&f.store, "luis", Role::Student).await;
        let teacher = user(&f.store, "prof", Role::Teacher).await;
        let a = course(&f.store, "A").await;
        let b = course(&f.store, "B").await;
        f.store.insert_prerequisite(b, a).await.unwrap();

        assert!(matches!(
            f.ledger.check_eligibility(&luis, ana.id, a).await,
            Err(LedgerError::Forbidden(_))
        ));
        assert!(f.ledger.check_eligibility(&ana, ana.id, a).await.unwrap().is_eligible());
        assert!(!f.ledger.check_eligibility(&teacher, ana.id, b).await.unwrap().is_eligible());

        let eligible = f.ledger.eligible_courses(&ana, ana.id).await.unwrap();
        assert_eq!(eligible.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a]);
    }

    #[tokio::test]
    async fn passing_grade_policy_unlocks_dependents() {
        let f = fixture_with(CompletionPolicy::PassingGrade(60.0));
        let ana = user(&f.store, "ana", Role::Student).await;
        let a = course(&f.store, "A").await;
        let b = course(&f.store, "B").await;
        f.store.insert_prerequisite(b, a).await.unwrap();

        let first = f.ledger.enroll(&ana, ana.id, a).await.unwrap();
        f.ledger
            .update_grades(&f.admin, first.id, vec![Grade::new("Final", 75.0)])
            .await
            .unwrap();
        assert!(f.ledger.check_eligibility(&ana, ana.id, b).await.unwrap().is_eligible());
    }
}
