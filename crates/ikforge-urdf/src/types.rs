//! In-memory robot model.
//!
//! Links and joints are stored in URDF declaration order. The position of a
//! joint in [`RobotModel::joints`] is its [`JointId`], and the position of a
//! link in [`RobotModel::links`] is its link index.

use ikforge_core::JointId;
use sha2::{Digest, Sha256};

use crate::error::UrdfError;

// ---------------------------------------------------------------------------
// JointType
// ---------------------------------------------------------------------------

/// URDF joint type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// Rotation about a single axis, with position limits.
    Revolute,
    /// Unlimited rotation about a single axis.
    Continuous,
    /// Translation along an axis, with position limits.
    Prismatic,
    /// No relative motion between parent and child.
    Fixed,
    /// Unconstrained 6-DOF joint (rarely used).
    Floating,
    /// Translation in a plane (rarely used).
    Planar,
}

impl JointType {
    /// Whether this joint type contributes a single solvable degree of freedom.
    pub const fn is_actuated(self) -> bool {
        matches!(self, Self::Revolute | Self::Continuous | Self::Prismatic)
    }

    const fn code(self) -> &'static str {
        match self {
            Self::Revolute => "revolute",
            Self::Continuous => "continuous",
            Self::Prismatic => "prismatic",
            Self::Fixed => "fixed",
            Self::Floating => "floating",
            Self::Planar => "planar",
        }
    }
}

// ---------------------------------------------------------------------------
// JointLimits
// ---------------------------------------------------------------------------

/// Position limits of a joint. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointLimits {
    /// Lower position limit (rad or m).
    pub lower: Option<f64>,
    /// Upper position limit (rad or m).
    pub upper: Option<f64>,
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// A 3D pose specified as position + roll-pitch-yaw.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Origin {
    /// Translation `[x, y, z]` in meters.
    pub xyz: [f64; 3],
    /// Rotation `[roll, pitch, yaw]` in radians.
    pub rpy: [f64; 3],
}

// ---------------------------------------------------------------------------
// LinkData / JointData
// ---------------------------------------------------------------------------

/// A URDF link. Only the name matters for kinematics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkData {
    pub name: String,
}

impl LinkData {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// In-memory representation of a URDF joint.
#[derive(Debug, Clone, PartialEq)]
pub struct JointData {
    /// Joint name.
    pub name: String,
    /// Joint type.
    pub joint_type: JointType,
    /// Parent link name.
    pub parent: String,
    /// Child link name.
    pub child: String,
    /// Joint origin relative to parent link.
    pub origin: Origin,
    /// Joint axis (default `[0, 0, 1]`).
    pub axis: [f64; 3],
    /// Position limits.
    pub limits: JointLimits,
}

// ---------------------------------------------------------------------------
// RobotModel
// ---------------------------------------------------------------------------

/// Complete kinematic description of a robot.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotModel {
    /// Robot name.
    pub name: String,
    /// Links in declaration order.
    pub links: Vec<LinkData>,
    /// Joints in declaration order; the index is the [`JointId`].
    pub joints: Vec<JointData>,
    /// Name of the root link (the one never referenced as a child).
    pub root_link: String,
}

impl RobotModel {
    /// Get a link by name.
    pub fn link(&self, name: &str) -> Result<&LinkData, UrdfError> {
        self.links
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| UrdfError::MissingLink(name.into()))
    }

    /// Index of a link by name.
    pub fn link_index(&self, name: &str) -> Result<usize, UrdfError> {
        self.links
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| UrdfError::MissingLink(name.into()))
    }

    /// Get a joint by name.
    pub fn joint(&self, name: &str) -> Result<&JointData, UrdfError> {
        self.joints
            .iter()
            .find(|j| j.name == name)
            .ok_or_else(|| UrdfError::MissingJoint(name.into()))
    }

    /// [`JointId`] of a joint by name.
    pub fn joint_id(&self, name: &str) -> Result<JointId, UrdfError> {
        self.joints
            .iter()
            .position(|j| j.name == name)
            .ok_or_else(|| UrdfError::MissingJoint(name.into()))
    }

    /// Number of actuatable degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints
            .iter()
            .filter(|j| j.joint_type.is_actuated())
            .count()
    }

    /// Links that are never a parent of any joint.
    pub fn leaf_links(&self) -> Vec<&str> {
        self.links
            .iter()
            .filter(|l| !self.joints.iter().any(|j| j.parent == l.name))
            .map(|l| l.name.as_str())
            .collect()
    }

    /// Stable fingerprint of the robot's kinematic structure.
    ///
    /// SHA-256 over every link name and every joint's name, type, parent,
    /// child, origin, axis and limits, in declaration order. Floats are hashed
    /// by bit pattern. Returns the first 16 digest bytes as lowercase hex.
    pub fn structure_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for link in &self.links {
            hasher.update(b"link\0");
            hasher.update(link.name.as_bytes());
            hasher.update(b"\0");
        }
        for joint in &self.joints {
            hasher.update(b"joint\0");
            for field in [
                joint.name.as_str(),
                joint.joint_type.code(),
                joint.parent.as_str(),
                joint.child.as_str(),
            ] {
                hasher.update(field.as_bytes());
                hasher.update(b"\0");
            }
            let values = joint
                .origin
                .xyz
                .iter()
                .chain(&joint.origin.rpy)
                .chain(&joint.axis);
            for v in values {
                hasher.update(v.to_bits().to_le_bytes());
            }
            for limit in [joint.limits.lower, joint.limits.upper] {
                match limit {
                    Some(v) => {
                        hasher.update([1u8]);
                        hasher.update(v.to_bits().to_le_bytes());
                    }
                    None => hasher.update([0u8]),
                }
            }
        }
        let digest = hasher.finalize();
        hex::encode(&digest[..16])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn revolute(name: &str, parent: &str, child: &str) -> JointData {
        JointData {
            name: name.into(),
            joint_type: JointType::Revolute,
            parent: parent.into(),
            child: child.into(),
            origin: Origin::default(),
            axis: [0.0, 0.0, 1.0],
            limits: JointLimits {
                lower: Some(-1.57),
                upper: Some(1.57),
            },
        }
    }

    fn sample_model() -> RobotModel {
        let mut fixed = revolute("joint2", "link1", "link2");
        fixed.joint_type = JointType::Fixed;
        fixed.limits = JointLimits::default();
        RobotModel {
            name: "test_robot".into(),
            links: vec![
                LinkData::new("base"),
                LinkData::new("link1"),
                LinkData::new("link2"),
            ],
            joints: vec![revolute("joint1", "base", "link1"), fixed],
            root_link: "base".into(),
        }
    }

    #[test]
    fn joint_type_is_actuated() {
        assert!(JointType::Revolute.is_actuated());
        assert!(JointType::Continuous.is_actuated());
        assert!(JointType::Prismatic.is_actuated());
        assert!(!JointType::Fixed.is_actuated());
        assert!(!JointType::Floating.is_actuated());
        assert!(!JointType::Planar.is_actuated());
    }

    #[test]
    fn origin_default_is_zero() {
        let o = Origin::default();
        assert!(o.xyz.iter().all(|v| v.abs() < f64::EPSILON));
        assert!(o.rpy.iter().all(|v| v.abs() < f64::EPSILON));
    }

    #[test]
    fn model_lookups_use_declaration_order() {
        let model = sample_model();
        assert_eq!(model.link_index("link1").unwrap(), 1);
        assert_eq!(model.joint_id("joint2").unwrap(), 1);
        assert!(model.link("missing").is_err());
        assert!(matches!(
            model.joint_id("missing"),
            Err(UrdfError::MissingJoint(_))
        ));
    }

    #[test]
    fn model_dof() {
        assert_eq!(sample_model().dof(), 1);
    }

    #[test]
    fn leaf_links() {
        assert_eq!(sample_model().leaf_links(), vec!["link2"]);
    }

    #[test]
    fn structure_hash_is_stable_hex() {
        let model = sample_model();
        let h = model.structure_hash();
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(h, sample_model().structure_hash());
    }

    #[test]
    fn structure_hash_tracks_geometry() {
        let model = sample_model();
        let mut moved = sample_model();
        moved.joints[0].origin.xyz[2] = 0.1;
        assert_ne!(model.structure_hash(), moved.structure_hash());

        let mut renamed = sample_model();
        renamed.name = "other_name".into();
        // The robot name is not part of its structure.
        assert_eq!(model.structure_hash(), renamed.structure_hash());
    }

    #[test]
    fn structure_hash_distinguishes_missing_limits() {
        let mut a = sample_model();
        a.joints[0].limits.lower = None;
        let b = sample_model();
        assert_ne!(a.structure_hash(), b.structure_hash());
    }
}
