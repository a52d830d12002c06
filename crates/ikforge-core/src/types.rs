//! Core value types: joint identifiers, IK problem types and solve targets.

use std::fmt;
use std::str::FromStr;

use nalgebra::{Isometry3, UnitQuaternion, UnitVector3, Vector3};
use serde::{Deserialize, Serialize};

/// Index of a joint in its robot model, in declaration order.
pub type JointId = usize;

// ---------------------------------------------------------------------------
// ProblemType
// ---------------------------------------------------------------------------

/// The kind of end-effector constraint an analytic solver is generated for.
///
/// Each variant fixes the number of joints the solver must solve for
/// ([`expected_dof`](Self::expected_dof)), the short tag used in artifact
/// names, and the solve function the generator is asked to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProblemType {
    /// Full position + orientation of the end effector.
    #[default]
    #[serde(rename = "6d")]
    FullPose6D,
    /// Orientation only.
    #[serde(rename = "r3d")]
    Rotation3D,
    /// Direction of the end effector's z-axis.
    #[serde(rename = "d2d")]
    Direction3D,
    /// Position only.
    #[serde(rename = "t3d")]
    Translation3D,
}

impl ProblemType {
    /// Every problem type, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::FullPose6D,
        Self::Rotation3D,
        Self::Direction3D,
        Self::Translation3D,
    ];

    /// Number of solve joints this problem type requires.
    pub const fn expected_dof(self) -> usize {
        match self {
            Self::FullPose6D => 6,
            Self::Rotation3D | Self::Translation3D => 3,
            Self::Direction3D => 2,
        }
    }

    /// Short tag embedded in cache keys and file names.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::FullPose6D => "6d",
            Self::Rotation3D => "r3d",
            Self::Direction3D => "d2d",
            Self::Translation3D => "t3d",
        }
    }

    /// Name of the solve function the generator should emit.
    pub const fn solve_fn(self) -> &'static str {
        match self {
            Self::FullPose6D => "solveFullIK_6D",
            Self::Rotation3D => "solveFullIK_Rotation3D",
            Self::Direction3D => "solveFullIK_Direction3D",
            Self::Translation3D => "solveFullIK_Translation3D",
        }
    }

    /// Numeric code reported by a compiled solver's `ik_problem_type` entry point.
    pub const fn abi_code(self) -> i32 {
        match self {
            Self::FullPose6D => 0,
            Self::Rotation3D => 1,
            Self::Direction3D => 2,
            Self::Translation3D => 3,
        }
    }

    /// Inverse of [`abi_code`](Self::abi_code).
    pub const fn from_abi_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::FullPose6D),
            1 => Some(Self::Rotation3D),
            2 => Some(Self::Direction3D),
            3 => Some(Self::Translation3D),
            _ => None,
        }
    }
}

impl fmt::Display for ProblemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ProblemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == s)
            .ok_or_else(|| format!("unknown problem type '{s}' (expected 6d, r3d, d2d or t3d)"))
    }
}

// ---------------------------------------------------------------------------
// IkTarget
// ---------------------------------------------------------------------------

/// What a solver is asked to reach, in the chain's base frame.
#[derive(Debug, Clone, PartialEq)]
pub enum IkTarget {
    /// Full end-effector pose.
    Pose(Isometry3<f64>),
    /// End-effector orientation.
    Rotation(UnitQuaternion<f64>),
    /// Direction of the end-effector z-axis.
    Direction(UnitVector3<f64>),
    /// End-effector position.
    Translation(Vector3<f64>),
}

impl IkTarget {
    /// Project a full end-effector pose onto the constraint of `problem`.
    pub fn from_pose(problem: ProblemType, pose: &Isometry3<f64>) -> Self {
        match problem {
            ProblemType::FullPose6D => Self::Pose(*pose),
            ProblemType::Rotation3D => Self::Rotation(pose.rotation),
            ProblemType::Direction3D => {
                Self::Direction(UnitVector3::new_normalize(pose.rotation * Vector3::z()))
            }
            ProblemType::Translation3D => Self::Translation(pose.translation.vector),
        }
    }

    /// The problem type this target constrains.
    pub const fn problem_type(&self) -> ProblemType {
        match self {
            Self::Pose(_) => ProblemType::FullPose6D,
            Self::Rotation(_) => ProblemType::Rotation3D,
            Self::Direction(_) => ProblemType::Direction3D,
            Self::Translation(_) => ProblemType::Translation3D,
        }
    }

    /// Distance between `pose` and this target: `(position_error, angular_error)`.
    ///
    /// Components the target does not constrain are reported as zero.
    pub fn error_to(&self, pose: &Isometry3<f64>) -> (f64, f64) {
        match self {
            Self::Pose(target) => (
                (target.translation.vector - pose.translation.vector).norm(),
                target.rotation.angle_to(&pose.rotation),
            ),
            Self::Rotation(rot) => (0.0, rot.angle_to(&pose.rotation)),
            Self::Direction(dir) => {
                let z = pose.rotation * Vector3::z();
                (0.0, dir.into_inner().angle(&z))
            }
            Self::Translation(pos) => ((pos - pose.translation.vector).norm(), 0.0),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
