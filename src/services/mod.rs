pub mod completion;
pub mod course_service;
pub mod enrollment_service;

pub use completion::{CompletedCourses, EnrollmentCompletion};
pub use course_service::{CatalogError, CourseCatalog, CourseChanges, CourseView, NewCourse};
pub use enrollment_service::{EnrollmentLedger, EnrollmentView, LedgerError, RosterEntry};
