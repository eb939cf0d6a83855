// handlers/protected/courses - /api/courses/*
pub mod course; // CRUD
pub mod eligibility; // GET /api/courses/:id/eligibility
pub mod prerequisites; // POST/DELETE /api/courses/:id/prerequisites
pub mod students; // POST /api/courses/:id/students
pub mod teachers; // POST/DELETE /api/courses/:id/teachers

pub use course::{course_delete, course_get, course_list, course_post, course_put};
pub use eligibility::eligibility_get;
pub use prerequisites::{prerequisite_delete, prerequisite_post};
pub use students::student_post;
pub use teachers::{teacher_delete, teacher_post};
