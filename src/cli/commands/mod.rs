pub mod course;
pub mod eligible;
pub mod user;
