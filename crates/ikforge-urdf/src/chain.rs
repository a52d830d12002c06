//! Kinematic chain extracted from a [`RobotModel`].
//!
//! A [`KinematicChain`] is the ordered list of actuated joints from a base
//! link to an end-effector link. It carries the identity needed for caching
//! (joint ids, link indices, structural fingerprint) and the static transforms
//! needed for forward kinematics.

use ikforge_core::JointId;
use nalgebra::{Isometry3, Matrix3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use crate::error::UrdfError;
use crate::types::{JointType, Origin, RobotModel};

/// A single actuated joint in the kinematic chain.
#[derive(Debug, Clone)]
pub struct ChainJoint {
    /// Index of this joint in the robot model.
    pub id: JointId,
    /// Name of this joint (from URDF).
    pub name: String,
    /// Static transform from parent link frame to this joint frame, with any
    /// preceding fixed joints folded in.
    pub origin: Isometry3<f64>,
    /// Joint axis in the joint's local frame.
    pub axis: UnitVector3<f64>,
    /// Whether this is a prismatic joint (false = revolute).
    pub is_prismatic: bool,
    /// Lower position limit (rad or m).
    pub lower_limit: f64,
    /// Upper position limit (rad or m).
    pub upper_limit: f64,
}

/// An ordered kinematic chain from base to end-effector.
///
/// Never empty: construction fails if the path between the two links has no
/// actuated joints.
#[derive(Debug, Clone)]
pub struct KinematicChain {
    /// Ordered joints from base to end-effector.
    joints: Vec<ChainJoint>,
    /// Transform from the last joint's child link to the end-effector frame.
    ee_offset: Isometry3<f64>,
    /// Index of the base link in the robot model.
    base_link: usize,
    /// Index of the end-effector link in the robot model.
    ee_link: usize,
    /// Structural fingerprint of the whole robot.
    fingerprint: String,
}

impl KinematicChain {
    /// Build a kinematic chain from a [`RobotModel`].
    ///
    /// Traces from `base_link` to `ee_link`, collecting actuated joints.
    /// Fixed joints are folded into the accumulated transform.
    pub fn from_model(model: &RobotModel, base_link: &str, ee_link: &str) -> Result<Self, UrdfError> {
        let base_index = model.link_index(base_link)?;
        let ee_index = model.link_index(ee_link)?;
        let path = find_path_to_link(model, base_link, ee_link).ok_or_else(|| {
            UrdfError::Unreachable {
                base: base_link.into(),
                ee: ee_link.into(),
            }
        })?;

        let mut joints = Vec::new();
        let mut accumulated_fixed = Isometry3::identity();

        for joint_id in path {
            let joint = &model.joints[joint_id];
            let joint_origin = origin_to_isometry(&joint.origin);

            if joint.joint_type.is_actuated() {
                let combined_origin = accumulated_fixed * joint_origin;
                accumulated_fixed = Isometry3::identity();

                let axis = UnitVector3::new_normalize(Vector3::from(joint.axis));

                let (lower, upper) = match joint.joint_type {
                    JointType::Continuous => (-std::f64::consts::PI, std::f64::consts::PI),
                    _ => (
                        joint.limits.lower.unwrap_or(-std::f64::consts::PI),
                        joint.limits.upper.unwrap_or(std::f64::consts::PI),
                    ),
                };

                joints.push(ChainJoint {
                    id: joint_id,
                    name: joint.name.clone(),
                    origin: combined_origin,
                    axis,
                    is_prismatic: joint.joint_type == JointType::Prismatic,
                    lower_limit: lower,
                    upper_limit: upper,
                });
            } else {
                accumulated_fixed *= joint_origin;
            }
        }

        if joints.is_empty() {
            return Err(UrdfError::EmptyChain {
                base: base_link.into(),
                ee: ee_link.into(),
            });
        }

        Ok(Self {
            joints,
            ee_offset: accumulated_fixed,
            base_link: base_index,
            ee_link: ee_index,
            fingerprint: model.structure_hash(),
        })
    }

    /// Number of actuated degrees of freedom.
    pub fn dof(&self) -> usize {
        self.joints.len()
    }

    /// Joint ids in chain order (base to end effector).
    pub fn joint_ids(&self) -> Vec<JointId> {
        self.joints.iter().map(|j| j.id).collect()
    }

    /// Joint names in chain order.
    pub fn joint_names(&self) -> Vec<&str> {
        self.joints.iter().map(|j| j.name.as_str()).collect()
    }

    /// Access the joint definitions.
    pub fn joints(&self) -> &[ChainJoint] {
        &self.joints
    }

    /// Position of joint `id` within the chain.
    pub fn position_of(&self, id: JointId) -> Option<usize> {
        self.joints.iter().position(|j| j.id == id)
    }

    /// Index of the base link in the robot model.
    pub const fn base_link(&self) -> usize {
        self.base_link
    }

    /// Index of the end-effector link in the robot model.
    pub const fn ee_link(&self) -> usize {
        self.ee_link
    }

    /// Structural fingerprint of the robot this chain belongs to.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// End-effector offset after the last joint.
    pub fn ee_offset(&self) -> &Isometry3<f64> {
        &self.ee_offset
    }

    /// Compute forward kinematics: joint positions -> end-effector pose.
    ///
    /// # Panics
    ///
    /// Panics if `q.len() != self.dof()`.
    pub fn forward_kinematics(&self, q: &[f64]) -> Isometry3<f64> {
        assert_eq!(q.len(), self.dof(), "q.len() must equal chain DOF");

        let mut transform = Isometry3::identity();
        for (joint, &position) in self.joints.iter().zip(q) {
            transform *= joint.origin;
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }
        transform * self.ee_offset
    }

    /// Joint origins and axes in the base frame, plus the end-effector pose.
    ///
    /// Origins and axes are recorded before each joint's own motion, which is
    /// what the geometric Jacobian needs.
    pub fn joint_frames(&self, q: &[f64]) -> (Vec<Vector3<f64>>, Vec<Vector3<f64>>, Isometry3<f64>) {
        assert_eq!(q.len(), self.dof());

        let mut transform = Isometry3::identity();
        let mut origins = Vec::with_capacity(self.dof());
        let mut axes = Vec::with_capacity(self.dof());

        for (joint, &position) in self.joints.iter().zip(q) {
            transform *= joint.origin;
            origins.push(transform.translation.vector);
            axes.push(transform.rotation * joint.axis.into_inner());
            transform *= joint_transform(&joint.axis, joint.is_prismatic, position);
        }

        (origins, axes, transform * self.ee_offset)
    }

    /// Clamp joint positions to their limits.
    pub fn clamp_joints(&self, q: &mut [f64]) {
        for (value, joint) in q.iter_mut().zip(&self.joints) {
            *value = value.clamp(joint.lower_limit, joint.upper_limit);
        }
    }
}

/// Convert a URDF [`Origin`] (xyz + rpy) to an [`Isometry3`].
fn origin_to_isometry(origin: &Origin) -> Isometry3<f64> {
    let translation = Translation3::new(origin.xyz[0], origin.xyz[1], origin.xyz[2]);
    let rotation = UnitQuaternion::from_matrix(&rotation_matrix_from_rpy(
        origin.rpy[0],
        origin.rpy[1],
        origin.rpy[2],
    ));
    Isometry3::from_parts(translation, rotation)
}

/// Build a rotation matrix from roll-pitch-yaw (intrinsic XYZ / extrinsic ZYX).
fn rotation_matrix_from_rpy(roll: f64, pitch: f64, yaw: f64) -> Matrix3<f64> {
    let (sr, cr) = roll.sin_cos();
    let (sp, cp) = pitch.sin_cos();
    let (sy, cy) = yaw.sin_cos();

    Matrix3::new(
        cy * cp,
        cy * sp * sr - sy * cr,
        cy * sp * cr + sy * sr,
        sy * cp,
        sy * sp * sr + cy * cr,
        sy * sp * cr - cy * sr,
        -sp,
        cp * sr,
        cp * cr,
    )
}

/// Compute the transform for a single joint at a given position.
fn joint_transform(axis: &UnitVector3<f64>, is_prismatic: bool, position: f64) -> Isometry3<f64> {
    if is_prismatic {
        Isometry3::from_parts(
            Translation3::from(axis.into_inner() * position),
            UnitQuaternion::identity(),
        )
    } else {
        Isometry3::from_parts(
            Translation3::identity(),
            UnitQuaternion::from_axis_angle(axis, position),
        )
    }
}

/// Ordered joint ids from link `root` down to `target`.
fn find_path_to_link(model: &RobotModel, root: &str, target: &str) -> Option<Vec<JointId>> {
    if root == target {
        return Some(Vec::new());
    }

    for (id, joint) in model.joints.iter().enumerate() {
        if joint.parent == root {
            if let Some(mut path) = find_path_to_link(model, &joint.child, target) {
                path.insert(0, id);
                return Some(path);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_string;
    use approx::assert_relative_eq;

    const TWO_LINK_ARM: &str = r#"
        <robot name="two_link_arm">
            <link name="base"/>
            <link name="upper_arm"/>
            <link name="forearm"/>
            <link name="end_effector"/>
            <joint name="shoulder" type="revolute">
                <parent link="base"/><child link="upper_arm"/>
                <origin xyz="0 0 0.05" rpy="0 0 0"/>
                <axis xyz="0 0 1"/>
                <limit lower="-2.617" upper="2.617" effort="50" velocity="3"/>
            </joint>
            <joint name="elbow" type="revolute">
                <parent link="upper_arm"/><child link="forearm"/>
                <origin xyz="0 0 0.3" rpy="0 0 0"/>
                <axis xyz="0 1 0"/>
                <limit lower="-2.094" upper="2.094" effort="30" velocity="5"/>
            </joint>
            <joint name="ee_fixed" type="fixed">
                <parent link="forearm"/><child link="end_effector"/>
                <origin xyz="0 0 0.25"/>
            </joint>
        </robot>
    "#;

    fn two_link() -> KinematicChain {
        let model = parse_string(TWO_LINK_ARM).unwrap();
        KinematicChain::from_model(&model, "base", "end_effector").unwrap()
    }

    #[test]
    fn chain_from_two_link_arm() {
        let chain = two_link();
        assert_eq!(chain.dof(), 2);
        assert_eq!(chain.joint_names(), vec!["shoulder", "elbow"]);
        assert_eq!(chain.joint_ids(), vec![0, 1]);
        assert_eq!(chain.base_link(), 0);
        assert_eq!(chain.ee_link(), 3);
        assert_eq!(chain.position_of(1), Some(1));
        assert_eq!(chain.position_of(2), None);
    }

    #[test]
    fn chain_carries_robot_fingerprint() {
        let model = parse_string(TWO_LINK_ARM).unwrap();
        let chain = KinematicChain::from_model(&model, "base", "end_effector").unwrap();
        assert_eq!(chain.fingerprint(), model.structure_hash());
        // A sub-chain of the same robot shares the fingerprint.
        let short = KinematicChain::from_model(&model, "upper_arm", "end_effector").unwrap();
        assert_eq!(short.fingerprint(), chain.fingerprint());
        assert_eq!(short.joint_ids(), vec![1]);
    }

    #[test]
    fn fk_zero_position() {
        let chain = two_link();
        // 0.05 + 0.3 + 0.25 straight up
        let ee = chain.forward_kinematics(&[0.0, 0.0]);
        assert_relative_eq!(ee.translation.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(ee.translation.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(ee.translation.z, 0.6, epsilon = 1e-9);
    }

    #[test]
    fn fk_elbow_90_deg() {
        let chain = two_link();
        // Elbow pitches the 0.25 forearm segment about Y onto +X.
        let ee = chain.forward_kinematics(&[0.0, std::f64::consts::FRAC_PI_2]);
        assert_relative_eq!(ee.translation.x, 0.25, epsilon = 1e-9);
        assert_relative_eq!(ee.translation.z, 0.35, epsilon = 1e-9);
    }

    #[test]
    fn joint_frames_match_fk() {
        let chain = two_link();
        let q = [0.3, -0.7];
        let (origins, axes, ee) = chain.joint_frames(&q);
        assert_eq!(origins.len(), 2);
        assert_relative_eq!(origins[1].z, 0.35, epsilon = 1e-9);
        assert_relative_eq!(axes[0].z, 1.0, epsilon = 1e-9);
        let fk = chain.forward_kinematics(&q);
        assert_relative_eq!(
            (ee.translation.vector - fk.translation.vector).norm(),
            0.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn chain_to_unreachable_link_fails() {
        let model = parse_string(TWO_LINK_ARM).unwrap();
        let err = KinematicChain::from_model(&model, "forearm", "base").unwrap_err();
        assert!(matches!(err, UrdfError::Unreachable { .. }));
        let err = KinematicChain::from_model(&model, "base", "nonexistent").unwrap_err();
        assert!(matches!(err, UrdfError::MissingLink(_)));
    }

    #[test]
    fn chain_without_actuated_joints_fails() {
        let model = parse_string(TWO_LINK_ARM).unwrap();
        let err = KinematicChain::from_model(&model, "forearm", "end_effector").unwrap_err();
        assert!(matches!(err, UrdfError::EmptyChain { .. }));
    }

    #[test]
    fn clamp_joints() {
        let chain = two_link();
        let mut q = [5.0, -5.0];
        chain.clamp_joints(&mut q);
        assert_relative_eq!(q[0], 2.617, epsilon = 1e-12);
        assert_relative_eq!(q[1], -2.094, epsilon = 1e-12);
    }

    #[test]
    fn origin_to_isometry_translation() {
        let origin = Origin {
            xyz: [1.0, 2.0, 3.0],
            rpy: [0.0, 0.0, 0.0],
        };
        let iso = origin_to_isometry(&origin);
        assert_relative_eq!(iso.translation.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(iso.translation.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(iso.translation.z, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn rpy_yaw_rotates_about_z() {
        let origin = Origin {
            xyz: [0.0; 3],
            rpy: [0.0, 0.0, std::f64::consts::FRAC_PI_2],
        };
        let iso = origin_to_isometry(&origin);
        let x = iso.rotation * Vector3::x();
        assert_relative_eq!(x.y, 1.0, epsilon = 1e-9);
    }
}
