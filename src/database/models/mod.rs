pub mod course;
pub mod enrollment;
pub mod user;

pub use course::{Course, CourseSummary, Schedule};
pub use enrollment::{Enrollment, Grade};
pub use user::{NewUser, User, UserIdentity};
