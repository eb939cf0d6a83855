use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Weekly meeting slot of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub day: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub classroom: Option<String>,
    pub schedule: Option<Schedule>,
    /// Direct prerequisites, in the order they were added
    pub prerequisites: Vec<Uuid>,
    /// Assigned teachers, in the order they were added
    pub teachers: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Course {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            code: None,
            description: None,
            classroom: None,
            schedule: None,
            prerequisites: Vec::new(),
            teachers: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn summary(&self) -> CourseSummary {
        CourseSummary {
            id: self.id,
            title: self.title.clone(),
            code: self.code.clone(),
        }
    }

    pub fn has_teacher(&self, user_id: Uuid) -> bool {
        self.teachers.contains(&user_id)
    }
}

/// Identity of a course as shown inside other payloads (prerequisite lists,
/// missing-prerequisite reports).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub id: Uuid,
    pub title: String,
    pub code: Option<String>,
}
