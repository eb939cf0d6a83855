// handlers/protected/enrollments - /api/enrollments/*
pub mod enrollment;
pub mod grading;

pub use enrollment::{by_course_get, enrollment_delete, enrollment_post, me_get};
pub use grading::{completion_put, grades_put};
