pub mod eligible_courses;

pub use eligible_courses::eligible_courses_get;
