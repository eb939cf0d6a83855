pub mod engine;
pub mod error;
pub mod graph;

pub use engine::{Decision, EligibilityEngine};
pub use error::GraphError;
pub use graph::CourseGraph;
