//! URDF fixtures and chain helpers.

use ikforge_urdf::{KinematicChain, RobotModel, parse_string};

/// Pan/tilt head: two revolute joints, camera frame on a fixed joint.
///
/// Chain `base` → `camera` has joints `[0, 1]`.
pub const PAN_TILT_URDF: &str = r#"
<robot name="pan_tilt">
  <link name="base"/>
  <link name="pan_link"/>
  <link name="tilt_link"/>
  <link name="camera"/>
  <joint name="pan" type="revolute">
    <parent link="base"/><child link="pan_link"/>
    <origin xyz="0 0 0.05"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="5" velocity="2"/>
  </joint>
  <joint name="tilt" type="revolute">
    <parent link="pan_link"/><child link="tilt_link"/>
    <origin xyz="0 0 0.08"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.2" upper="1.2" effort="5" velocity="2"/>
  </joint>
  <joint name="camera_mount" type="fixed">
    <parent link="tilt_link"/><child link="camera"/>
    <origin xyz="0 0 0.04"/>
  </joint>
</robot>
"#;

/// Six revolute joints in a common anthropomorphic layout.
///
/// Chain `base_link` → `tool0` has joints `[0..6)`.
pub const SIX_DOF_URDF: &str = r#"
<robot name="six_dof_arm">
  <link name="base_link"/>
  <link name="shoulder"/>
  <link name="upper_arm"/>
  <link name="forearm"/>
  <link name="wrist_1"/>
  <link name="wrist_2"/>
  <link name="wrist_3"/>
  <link name="tool0"/>
  <joint name="j1" type="revolute">
    <parent link="base_link"/><child link="shoulder"/>
    <origin xyz="0 0 0.15"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="50" velocity="2"/>
  </joint>
  <joint name="j2" type="revolute">
    <parent link="shoulder"/><child link="upper_arm"/>
    <origin xyz="0 0.1 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.0" upper="2.0" effort="50" velocity="2"/>
  </joint>
  <joint name="j3" type="revolute">
    <parent link="upper_arm"/><child link="forearm"/>
    <origin xyz="0 0 0.4"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.5" upper="2.5" effort="30" velocity="2"/>
  </joint>
  <joint name="j4" type="revolute">
    <parent link="forearm"/><child link="wrist_1"/>
    <origin xyz="0 0 0.35"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="10" velocity="3"/>
  </joint>
  <joint name="j5" type="revolute">
    <parent link="wrist_1"/><child link="wrist_2"/>
    <origin xyz="0 0 0.08"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.0" upper="2.0" effort="10" velocity="3"/>
  </joint>
  <joint name="j6" type="revolute">
    <parent link="wrist_2"/><child link="wrist_3"/>
    <origin xyz="0 0 0.08"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="10" velocity="3"/>
  </joint>
  <joint name="flange" type="fixed">
    <parent link="wrist_3"/><child link="tool0"/>
    <origin xyz="0 0 0.05"/>
  </joint>
</robot>
"#;

/// Eight actuated joints: a prismatic lift, a torso yaw and a 6-DOF arm.
///
/// Chain `base` → `gripper` has joints `[0..8)`; the fixed `flange` is id 8.
pub const EIGHT_DOF_URDF: &str = r#"
<robot name="mobile_manipulator">
  <link name="base"/>
  <link name="lift"/>
  <link name="torso"/>
  <link name="shoulder"/>
  <link name="upper_arm"/>
  <link name="forearm"/>
  <link name="wrist_1"/>
  <link name="wrist_2"/>
  <link name="wrist_3"/>
  <link name="gripper"/>
  <joint name="lift_joint" type="prismatic">
    <parent link="base"/><child link="lift"/>
    <origin xyz="0 0 0.3"/>
    <axis xyz="0 0 1"/>
    <limit lower="0.0" upper="0.4" effort="100" velocity="0.2"/>
  </joint>
  <joint name="torso_yaw" type="revolute">
    <parent link="lift"/><child link="torso"/>
    <origin xyz="0 0 0.1"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="50" velocity="1"/>
  </joint>
  <joint name="shoulder_pan" type="revolute">
    <parent link="torso"/><child link="shoulder"/>
    <origin xyz="0.1 0 0.2"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="50" velocity="2"/>
  </joint>
  <joint name="shoulder_lift" type="revolute">
    <parent link="shoulder"/><child link="upper_arm"/>
    <origin xyz="0 0.1 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.0" upper="2.0" effort="50" velocity="2"/>
  </joint>
  <joint name="elbow" type="revolute">
    <parent link="upper_arm"/><child link="forearm"/>
    <origin xyz="0 0 0.35"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.5" upper="2.5" effort="30" velocity="2"/>
  </joint>
  <joint name="wrist_roll" type="continuous">
    <parent link="forearm"/><child link="wrist_1"/>
    <origin xyz="0 0 0.3"/>
    <axis xyz="0 0 1"/>
  </joint>
  <joint name="wrist_pitch" type="revolute">
    <parent link="wrist_1"/><child link="wrist_2"/>
    <origin xyz="0 0 0.07"/>
    <axis xyz="0 1 0"/>
    <limit lower="-2.0" upper="2.0" effort="10" velocity="3"/>
  </joint>
  <joint name="wrist_yaw" type="revolute">
    <parent link="wrist_2"/><child link="wrist_3"/>
    <origin xyz="0 0 0.07"/>
    <axis xyz="0 0 1"/>
    <limit lower="-2.5" upper="2.5" effort="10" velocity="3"/>
  </joint>
  <joint name="flange" type="fixed">
    <parent link="wrist_3"/><child link="gripper"/>
    <origin xyz="0 0 0.1"/>
  </joint>
</robot>
"#;

/// Parse a fixture.
///
/// # Panics
///
/// Panics if the fixture is not valid URDF.
pub fn model(urdf: &str) -> RobotModel {
    parse_string(urdf).expect("fixture URDF must parse")
}

/// Parse a fixture and extract the chain between two links.
///
/// # Panics
///
/// Panics if the fixture does not parse or the links are not connected.
pub fn chain(urdf: &str, base_link: &str, ee_link: &str) -> KinematicChain {
    KinematicChain::from_model(&model(urdf), base_link, ee_link)
        .expect("fixture chain must exist")
}

/// Two-joint pan/tilt chain.
pub fn pan_tilt_chain() -> KinematicChain {
    chain(PAN_TILT_URDF, "base", "camera")
}

/// Six-joint arm chain.
pub fn six_dof_chain() -> KinematicChain {
    chain(SIX_DOF_URDF, "base_link", "tool0")
}

/// Eight-joint mobile manipulator chain.
pub fn eight_dof_chain() -> KinematicChain {
    chain(EIGHT_DOF_URDF, "base", "gripper")
}

/// `(lower, upper)` limits of every chain joint, for sampling.
pub fn joint_limits(chain: &KinematicChain) -> Vec<(f64, f64)> {
    chain
        .joints()
        .iter()
        .map(|j| (j.lower_limit, j.upper_limit))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixture_chains_have_expected_joints() {
        assert_eq!(pan_tilt_chain().joint_ids(), vec![0, 1]);
        assert_eq!(six_dof_chain().joint_ids(), (0..6).collect::<Vec<_>>());
        assert_eq!(eight_dof_chain().joint_ids(), (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn fixture_fingerprints_are_distinct() {
        let a = pan_tilt_chain();
        let b = six_dof_chain();
        let c = eight_dof_chain();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_ne!(b.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 32);
    }

    #[test]
    fn limits_follow_chain_order() {
        let limits = joint_limits(&eight_dof_chain());
        assert_eq!(limits.len(), 8);
        assert_eq!(limits[0], (0.0, 0.4));
    }
}
