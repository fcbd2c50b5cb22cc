use thiserror::Error;

/// Error types for skeleton, clip and state graph authoring
///
/// Only construction and authoring APIs return these. Pose evaluation
/// recovers locally and leaves the previous pose in place instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimError {
    /// A joint refers to a parent index outside the skeleton
    #[error("Invalid parent: joint {joint} refers to parent {parent}, skeleton has {count} joints")]
    InvalidParent {
        joint: usize,
        parent: usize,
        count: usize,
    },

    /// Parent links loop back on themselves
    #[error("Hierarchy cycle detected at joint {0}")]
    HierarchyCycle(usize),

    /// Two joints share the same interned name
    #[error("Duplicate joint name handle {name} at joints {first} and {second}")]
    DuplicateJoint {
        name: u32,
        first: usize,
        second: usize,
    },

    /// Joint index outside the skeleton
    #[error("Joint index {index} out of range ({count} joints)")]
    JointOutOfRange { index: usize, count: usize },

    /// Keyframe track with inconsistent data
    #[error("Invalid track: {0}")]
    InvalidTrack(String),

    /// State graph referring to states that do not exist
    #[error("Invalid state graph: {0}")]
    InvalidGraph(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
