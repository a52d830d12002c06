//! Robot model and chain extraction errors.

use std::path::PathBuf;

/// Failure to read a robot description or extract a manipulator chain from it.
#[derive(Debug, thiserror::Error)]
pub enum UrdfError {
    #[error("cannot read robot file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The XML is not a valid URDF document.
    #[error("invalid URDF: {0}")]
    Parse(String),

    #[error("robot has no link named {0}")]
    MissingLink(String),

    #[error("robot has no joint named {0}")]
    MissingJoint(String),

    /// Joint kinds the kinematics cannot express (spherical).
    #[error("unsupported joint type: {0}")]
    UnsupportedJointType(String),

    /// Every declared link is the child of some joint.
    #[error("robot has no root link")]
    NoRootLink,

    /// The end-effector link is not a descendant of the base link.
    #[error("link {ee} is not reachable from {base}")]
    Unreachable { base: String, ee: String },

    /// The path between base and end effector has no actuated joints.
    #[error("no actuated joints between {base} and {ee}")]
    EmptyChain { base: String, ee: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
