use thiserror::Error;
use uuid::Uuid;

/// Rejected prerequisite-graph mutations. The graph is unchanged whenever
/// one of these is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Course not found: {0}")]
    NotFound(Uuid),

    #[error("Course {0} cannot be its own prerequisite")]
    SelfReference(Uuid),

    #[error("Course {course} already requires {prerequisite}")]
    DuplicateEdge { course: Uuid, prerequisite: Uuid },

    #[error("Requiring {prerequisite} for {course} would create a prerequisite cycle")]
    CycleDetected { course: Uuid, prerequisite: Uuid },
}
