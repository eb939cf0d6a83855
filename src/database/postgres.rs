use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Course, Enrollment, Grade, Schedule, User, UserIdentity};
use super::{IdentityResolver, Store};

/// Advisory lock key serializing prerequisite inserts across connections
const PREREQUISITE_LOCK_KEY: i64 = 0x5349_4741_5052_4551;

/// Does $1 (directly or transitively) require $2?
const REQUIRES_SQL: &str = r#"
    WITH RECURSIVE reachable(id) AS (
        SELECT prerequisite_id FROM course_prerequisites WHERE course_id = $1
        UNION
        SELECT cp.prerequisite_id
        FROM course_prerequisites cp
        JOIN reachable r ON cp.course_id = r.id
    )
    SELECT EXISTS (SELECT 1 FROM reachable WHERE id = $2)
"#;

const COURSE_COLUMNS: &str = "id, title, code, description, classroom, schedule, created_at";
const ENROLLMENT_COLUMNS: &str = "id, student_id, course_id, grades, completed, created_at";
const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, role, created_at";

#[derive(FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    code: Option<String>,
    description: Option<String>,
    classroom: Option<String>,
    schedule: Option<Json<Schedule>>,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct EdgeRow {
    course_id: Uuid,
    other_id: Uuid,
}

#[derive(FromRow)]
struct EnrollmentRow {
    id: Uuid,
    student_id: Uuid,
    course_id: Uuid,
    grades: Json<Vec<Grade>>,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl From<EnrollmentRow> for Enrollment {
    fn from(row: EnrollmentRow) -> Self {
        Self {
            id: row.id,
            student_id: row.student_id,
            course_id: row.course_id,
            grades: row.grades.0,
            completed: row.completed,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse().map_err(DatabaseError::Corrupt)?;
        Ok(Self {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role,
            created_at: row.created_at,
        })
    }
}

/// Map constraint violations raised by writes to storage errors.
fn on_write(err: sqlx::Error, entity: &'static str) -> DatabaseError {
    if let sqlx::Error::Database(db) = &err {
        match db.code().as_deref() {
            Some("23505") => return DatabaseError::Duplicate(entity),
            Some("23503") => {
                return DatabaseError::MissingReference(referenced_entity(db.constraint(), entity))
            }
            _ => {}
        }
    }
    DatabaseError::Sqlx(err)
}

/// Entity behind a foreign key, from PostgreSQL's default `<table>_<column>_fkey` names
fn referenced_entity(constraint: Option<&str>, fallback: &'static str) -> &'static str {
    match constraint {
        Some(c) if c.ends_with("student_id_fkey") || c.ends_with("teacher_id_fkey") => "user",
        Some(c) if c.ends_with("course_id_fkey") || c.ends_with("prerequisite_id_fkey") => "course",
        _ => fallback,
    }
}

/// PostgreSQL-backed store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn attach_edges(&self, rows: Vec<CourseRow>) -> Result<Vec<Course>, DatabaseError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let prerequisites: Vec<EdgeRow> = sqlx::query_as(
            "SELECT course_id, prerequisite_id AS other_id FROM course_prerequisites \
             WHERE course_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let teachers: Vec<EdgeRow> = sqlx::query_as(
            "SELECT course_id, teacher_id AS other_id FROM course_teachers \
             WHERE course_id = ANY($1) ORDER BY position",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut prereq_map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for edge in prerequisites {
            prereq_map.entry(edge.course_id).or_default().push(edge.other_id);
        }
        let mut teacher_map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for edge in teachers {
            teacher_map.entry(edge.course_id).or_default().push(edge.other_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| Course {
                prerequisites: prereq_map.remove(&row.id).unwrap_or_default(),
                teachers: teacher_map.remove(&row.id).unwrap_or_default(),
                id: row.id,
                title: row.title,
                code: row.code,
                description: row.description,
                classroom: row.classroom,
                schedule: row.schedule.map(|s| s.0),
                created_at: row.created_at,
            })
            .collect())
    }

    async fn fetch_enrollments(&self, sql: &str, key: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        let rows: Vec<EnrollmentRow> = sqlx::query_as(sql).bind(key).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Enrollment::from).collect())
    }
}

#[async_trait]
impl IdentityResolver for PgStore {
    async fn resolve(&self, user_ids: &[Uuid]) -> Result<HashMap<Uuid, UserIdentity>, DatabaseError> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(user_ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| User::try_from(row).map(|u| (u.id, u.identity())))
            .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn get_course(&self, id: Uuid) -> Result<Option<Course>, DatabaseError> {
        let sql = format!("SELECT {} FROM courses WHERE id = $1", COURSE_COLUMNS);
        let row: Option<CourseRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.attach_edges(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_courses(&self) -> Result<Vec<Course>, DatabaseError> {
        let sql = format!("SELECT {} FROM courses ORDER BY created_at, id", COURSE_COLUMNS);
        let rows: Vec<CourseRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        self.attach_edges(rows).await
    }

    async fn create_course(&self, course: &Course) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO courses (id, title, code, description, classroom, schedule, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.code)
        .bind(&course.description)
        .bind(&course.classroom)
        .bind(course.schedule.as_ref().map(Json))
        .bind(course.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| on_write(e, "course"))?;
        Ok(())
    }

    async fn save_course(&self, course: &Course) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "UPDATE courses SET title = $2, code = $3, description = $4, classroom = $5, schedule = $6 \
             WHERE id = $1",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.code)
        .bind(&course.description)
        .bind(&course.classroom)
        .bind(course.schedule.as_ref().map(Json))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("course {}", course.id)));
        }
        Ok(())
    }

    async fn delete_course(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| match on_write(e, "course") {
                // enrollments.course_id is ON DELETE RESTRICT
                DatabaseError::MissingReference(entity) => DatabaseError::InUse(entity),
                other => other,
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<(), DatabaseError> {
        if course_id == prereq_id {
            return Err(DatabaseError::Cycle);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(PREREQUISITE_LOCK_KEY)
            .execute(&mut *tx)
            .await?;

        let closes_cycle: bool = sqlx::query_scalar(REQUIRES_SQL)
            .bind(prereq_id)
            .bind(course_id)
            .fetch_one(&mut *tx)
            .await?;
        if closes_cycle {
            return Err(DatabaseError::Cycle);
        }

        sqlx::query("INSERT INTO course_prerequisites (course_id, prerequisite_id) VALUES ($1, $2)")
            .bind(course_id)
            .bind(prereq_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match on_write(e, "prerequisite") {
                DatabaseError::MissingReference(_) => DatabaseError::MissingReference("course"),
                other => other,
            })?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_prerequisite(&self, course_id: Uuid, prereq_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM course_prerequisites WHERE course_id = $1 AND prerequisite_id = $2")
            .bind(course_id)
            .bind(prereq_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO course_teachers (course_id, teacher_id) VALUES ($1, $2)")
            .bind(course_id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await
            .map_err(|e| on_write(e, "teacher"))?;
        Ok(())
    }

    async fn delete_teacher(&self, course_id: Uuid, teacher_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM course_teachers WHERE course_id = $1 AND teacher_id = $2")
            .bind(course_id)
            .bind(teacher_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_enrollment(&self, id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        let sql = format!("SELECT {} FROM enrollments WHERE id = $1", ENROLLMENT_COLUMNS);
        Ok(self.fetch_enrollments(&sql, id).await?.pop())
    }

    async fn find_enrollment(&self, student_id: Uuid, course_id: Uuid) -> Result<Option<Enrollment>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 AND course_id = $2",
            ENROLLMENT_COLUMNS
        );
        let row: Option<EnrollmentRow> = sqlx::query_as(&sql)
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Enrollment::from))
    }

    async fn create_enrollment(&self, enrollment: &Enrollment) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO enrollments (id, student_id, course_id, grades, completed, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(enrollment.id)
        .bind(enrollment.student_id)
        .bind(enrollment.course_id)
        .bind(Json(&enrollment.grades))
        .bind(enrollment.completed)
        .bind(enrollment.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| on_write(e, "enrollment"))?;
        Ok(())
    }

    async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE enrollments SET grades = $2, completed = $3 WHERE id = $1")
            .bind(enrollment.id)
            .bind(Json(&enrollment.grades))
            .bind(enrollment.completed)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_enrollment(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_enrollments_by_course(&self, course_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE course_id = $1 ORDER BY created_at, id",
            ENROLLMENT_COLUMNS
        );
        self.fetch_enrollments(&sql, course_id).await
    }

    async fn list_enrollments_by_student(&self, student_id: Uuid) -> Result<Vec<Enrollment>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM enrollments WHERE student_id = $1 ORDER BY created_at, id",
            ENROLLMENT_COLUMNS
        );
        self.fetch_enrollments(&sql, student_id).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(email.trim().to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, user: &User) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, password_hash, role, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| on_write(e, "email"))?;
        Ok(())
    }
}
