//! Splitting a chain into solve joints and free joints.
//!
//! An analytic solver solves for exactly
//! [`ProblemType::expected_dof`](ikforge_core::ProblemType::expected_dof)
//! joints. Any extra chain joints become free parameters supplied by the
//! caller at solve time. Callers can name the free joints explicitly;
//! otherwise a [`FreeJointPolicy`] picks them.

use std::fmt::Write as _;

use ikforge_core::{ForgeError, JointId};
use tracing::info;

// ---------------------------------------------------------------------------
// JointPartition
// ---------------------------------------------------------------------------

/// Solve joints and free joints of one generation request.
///
/// `solve_joints ∪ free_joints` equals the chain's joints as a set and the
/// two never overlap. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JointPartition {
    solve_joints: Vec<JointId>,
    free_joints: Vec<JointId>,
}

impl JointPartition {
    /// Joints the solver computes, in chain order.
    pub fn solve_joints(&self) -> &[JointId] {
        &self.solve_joints
    }

    /// Joints supplied as inputs at solve time, in removal order.
    pub fn free_joints(&self) -> &[JointId] {
        &self.free_joints
    }

    /// File name suffix: `_<solve>` plus `_f<free>` when there are free joints.
    ///
    /// `[0,1,4,5,6,7]` / `[2,3]` gives `_0_1_4_5_6_7_f2_3`.
    pub fn suffix(&self) -> String {
        let mut suffix = String::new();
        for id in &self.solve_joints {
            let _ = write!(suffix, "_{id}");
        }
        if !self.free_joints.is_empty() {
            suffix.push_str("_f");
            let free: Vec<String> = self.free_joints.iter().map(ToString::to_string).collect();
            suffix.push_str(&free.join("_"));
        }
        suffix
    }
}

// ---------------------------------------------------------------------------
// FreeJointPolicy
// ---------------------------------------------------------------------------

/// Which joint to drop next when a chain has more joints than the solver needs.
///
/// The choice is re-evaluated against the shrinking sequence after every
/// removal. None of the policies guarantees the remaining joints are
/// solvable; pass explicit free joints when that matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FreeJointPolicy {
    /// Drop position 2 when solving 6 joints, otherwise position 0.
    ///
    /// On common 7+ DOF arms position 2 is a shoulder/upper-arm redundancy.
    #[default]
    Heuristic,
    /// Always drop the joint closest to the base.
    FromBase,
    /// Always drop the joint closest to the end effector.
    FromTip,
}

impl FreeJointPolicy {
    /// Position in `remaining` (length > `expected_dof`) to remove next.
    pub const fn removal_position(self, expected_dof: usize, remaining: usize) -> usize {
        match self {
            Self::Heuristic => {
                if expected_dof == 6 {
                    2
                } else {
                    0
                }
            }
            Self::FromBase => 0,
            Self::FromTip => remaining - 1,
        }
    }
}

// ---------------------------------------------------------------------------
// partition
// ---------------------------------------------------------------------------

/// Partition `chain_joints` with the default [`FreeJointPolicy::Heuristic`].
pub fn partition(
    chain_joints: &[JointId],
    expected_dof: usize,
    explicit_free_joints: Option<&[JointId]>,
) -> Result<JointPartition, ForgeError> {
    partition_with_policy(
        chain_joints,
        expected_dof,
        explicit_free_joints,
        FreeJointPolicy::default(),
    )
}

/// Partition `chain_joints` into `expected_dof` solve joints and free joints.
///
/// Explicit free joints are removed first (each must be in the chain). If more
/// than `expected_dof` joints remain, `policy` removes joints one at a time and
/// appends them to the free list.
pub fn partition_with_policy(
    chain_joints: &[JointId],
    expected_dof: usize,
    explicit_free_joints: Option<&[JointId]>,
    policy: FreeJointPolicy,
) -> Result<JointPartition, ForgeError> {
    let mut solve_joints = chain_joints.to_vec();
    let mut free_joints = Vec::new();

    for &joint in explicit_free_joints.unwrap_or_default() {
        let Some(pos) = solve_joints.iter().position(|&j| j == joint) else {
            return Err(ForgeError::UnknownJoint {
                joint,
                chain: chain_joints.to_vec(),
            });
        };
        free_joints.push(solve_joints.remove(pos));
    }

    if solve_joints.len() > expected_dof {
        info!(
            chain_len = solve_joints.len(),
            expected_dof, "choosing free joints"
        );
        while solve_joints.len() > expected_dof {
            let pos = policy.removal_position(expected_dof, solve_joints.len());
            free_joints.push(solve_joints.remove(pos));
        }
    }

    if solve_joints.len() != expected_dof {
        return Err(ForgeError::InvalidConfiguration(format!(
            "Need {expected_dof} solve joints, got: {}",
            solve_joints.len()
        )));
    }

    Ok(JointPartition {
        solve_joints,
        free_joints,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn assert_complete(p: &JointPartition, chain: &[JointId]) {
        let mut all: Vec<JointId> = p
            .solve_joints()
            .iter()
            .chain(p.free_joints())
            .copied()
            .collect();
        assert_eq!(all.len(), chain.len(), "no duplicates, nothing lost");
        all.sort_unstable();
        let expected: BTreeSet<JointId> = chain.iter().copied().collect();
        assert_eq!(all.into_iter().collect::<BTreeSet<_>>(), expected);
    }

    #[test]
    fn six_dof_drops_position_two_of_shrinking_list() {
        let chain = [0, 1, 2, 3, 4, 5, 6, 7];
        let p = partition(&chain, 6, None).unwrap();
        assert_eq!(p.solve_joints(), &[0, 1, 4, 5, 6, 7]);
        assert_eq!(p.free_joints(), &[2, 3]);
        assert_complete(&p, &chain);
    }

    #[test]
    fn other_dof_drops_from_base() {
        let chain = [10, 11, 12, 13, 14];
        let p = partition(&chain, 3, None).unwrap();
        assert_eq!(p.solve_joints(), &[12, 13, 14]);
        assert_eq!(p.free_joints(), &[10, 11]);

        let p = partition(&chain, 2, None).unwrap();
        assert_eq!(p.solve_joints(), &[13, 14]);
        assert_eq!(p.free_joints(), &[10, 11, 12]);
    }

    #[test]
    fn exact_chain_has_no_free_joints() {
        let chain = [0, 1, 2, 3, 4, 5];
        let p = partition(&chain, 6, None).unwrap();
        assert_eq!(p.solve_joints(), &chain);
        assert!(p.free_joints().is_empty());
    }

    #[test]
    fn partition_is_deterministic() {
        let chain = [3, 9, 1, 7, 5, 2, 8];
        let a = partition(&chain, 6, None).unwrap();
        let b = partition(&chain, 6, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn too_few_joints_is_invalid() {
        let err = partition(&[0, 1], 6, None).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfiguration(_)));
        assert_eq!(
            err.to_string(),
            "Invalid configuration: Need 6 solve joints, got: 2"
        );
    }

    #[test]
    fn explicit_free_joints_are_removed_first() {
        let chain = [0, 1, 2, 3, 4, 5, 6];
        let p = partition(&chain, 6, Some(&[5])).unwrap();
        assert_eq!(p.solve_joints(), &[0, 1, 2, 3, 4, 6]);
        assert_eq!(p.free_joints(), &[5]);
    }

    #[test]
    fn explicit_free_joints_are_kept_when_more_are_needed() {
        let chain = [0, 1, 2, 3, 4, 5, 6, 7];
        let p = partition(&chain, 6, Some(&[7])).unwrap();
        assert_eq!(p.solve_joints(), &[0, 1, 3, 4, 5, 6]);
        assert_eq!(p.free_joints(), &[7, 2]);
        assert_complete(&p, &chain);
    }

    #[test]
    fn explicit_free_joints_leaving_too_few_is_invalid() {
        let err = partition(&[0, 1, 2, 3, 4, 5], 6, Some(&[0])).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidConfiguration(_)));
    }

    #[test]
    fn unknown_explicit_joint() {
        let err = partition(&[0, 1, 2], 2, Some(&[9])).unwrap_err();
        assert!(matches!(err, ForgeError::UnknownJoint { joint: 9, .. }));
    }

    #[test]
    fn duplicate_explicit_joint_is_unknown_the_second_time() {
        let err = partition(&[0, 1, 2, 3], 2, Some(&[1, 1])).unwrap_err();
        assert!(matches!(err, ForgeError::UnknownJoint { joint: 1, .. }));
    }

    #[test]
    fn from_tip_policy() {
        let chain = [0, 1, 2, 3, 4, 5, 6, 7];
        let p = partition_with_policy(&chain, 6, None, FreeJointPolicy::FromTip).unwrap();
        assert_eq!(p.solve_joints(), &[0, 1, 2, 3, 4, 5]);
        assert_eq!(p.free_joints(), &[7, 6]);
    }

    #[test]
    fn completeness_over_many_chains() {
        for len in 1..=10 {
            let chain: Vec<JointId> = (0..len).map(|i| i * 3).collect();
            for dof in [2, 3, 6] {
                match partition(&chain, dof, None) {
                    Ok(p) => {
                        assert_eq!(p.solve_joints().len(), dof);
                        assert_complete(&p, &chain);
                    }
                    Err(e) => {
                        assert!(len < dof);
                        assert!(matches!(e, ForgeError::InvalidConfiguration(_)));
                    }
                }
            }
        }
    }

    #[test]
    fn suffix_format() {
        let p = partition(&[0, 1, 2, 3, 4, 5, 6, 7], 6, None).unwrap();
        assert_eq!(p.suffix(), "_0_1_4_5_6_7_f2_3");
        let p = partition(&[0, 1, 2], 3, None).unwrap();
        assert_eq!(p.suffix(), "_0_1_2");
    }
}
