use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One assessment result. Names may repeat; re-grading appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub name: String,
    pub value: f64,
}

impl Grade {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    /// Chronological assessment order
    pub grades: Vec<Grade>,
    /// Explicit completion mark set by a teacher or admin
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(student_id: Uuid, course_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            grades: Vec::new(),
            completed: false,
            created_at: Utc::now(),
        }
    }

    /// Arithmetic mean of all recorded grades, `None` when nothing is graded yet.
    pub fn average_grade(&self) -> Option<f64> {
        if self.grades.is_empty() {
            return None;
        }
        let total: f64 = self.grades.iter().map(|g| g.value).sum();
        Some(total / self.grades.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_grade_of_empty_enrollment_is_none() {
        let e = Enrollment::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(e.average_grade(), None);
    }

    #[test]
    fn average_grade_counts_repeated_names() {
        let mut e = Enrollment::new(Uuid::new_v4(), Uuid::new_v4());
        e.grades = vec![
            Grade::new("Parcial 1", 40.0),
            Grade::new("Parcial 1", 80.0),
            Grade::new("Final", 90.0),
        ];
        assert_eq!(e.average_grade(), Some(70.0));
    }
}
