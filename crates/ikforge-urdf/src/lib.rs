//! URDF parsing and kinematic chain extraction for ikforge.
//!
//! A [`RobotModel`] keeps links and joints in declaration order so that a
//! joint's index is a stable [`JointId`](ikforge_core::JointId). A
//! [`KinematicChain`] is the ordered run of actuated joints between a base
//! link and an end-effector link, tagged with the robot's structural
//! fingerprint.
//!
//! # Architecture
//!
//! ```text
//! URDF ──► RobotModel ──► KinematicChain ──► (partition, cache key, FK)
//! ```

pub mod chain;
pub mod error;
pub mod parser;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use chain::{ChainJoint, KinematicChain};
pub use error::UrdfError;
pub use parser::{parse_file, parse_string};
pub use types::{JointData, JointLimits, JointType, LinkData, Origin, RobotModel};
