//! Randomized success-rate testing of a loaded solver.
//!
//! Samples joint configurations within limits, computes the end-effector
//! pose by forward kinematics, asks the solver to reach it (with the free
//! joints held at their sampled values), and checks that at least one
//! returned solution reproduces the target.

use ikforge_urdf::KinematicChain;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use ikforge_core::IkTarget;

use crate::solver::SolverHandle;

/// Outcome of a success-rate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessReport {
    pub samples: usize,
    pub successes: usize,
}

impl SuccessReport {
    /// Fraction of samples solved, in `[0, 1]`. Zero when nothing was sampled.
    #[allow(clippy::cast_precision_loss)]
    pub fn rate(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.successes as f64 / self.samples as f64
        }
    }

    /// Whether the rate reaches `threshold`.
    pub fn passes(&self, threshold: f64) -> bool {
        self.samples > 0 && self.rate() >= threshold
    }
}

/// Evaluates a loaded solver over random configurations.
pub trait SuccessRateEvaluator {
    fn evaluate(&self, chain: &KinematicChain, handle: &SolverHandle, samples: usize)
    -> SuccessReport;
}

/// Uniform sampling within joint limits from a seeded ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct RandomConfigEvaluator {
    pub seed: u64,
    /// Maximum position error of an accepted solution (meters).
    pub position_tolerance: f64,
    /// Maximum angular error of an accepted solution (radians).
    pub angle_tolerance: f64,
}

impl RandomConfigEvaluator {
    pub const fn new(seed: u64) -> Self {
        Self {
            seed,
            position_tolerance: 1e-3,
            angle_tolerance: 1e-2,
        }
    }

    fn sample(chain: &KinematicChain, rng: &mut ChaCha8Rng) -> Vec<f64> {
        chain
            .joints()
            .iter()
            .map(|j| j.lower_limit + (j.upper_limit - j.lower_limit) * rng.r#gen::<f64>())
            .collect()
    }

    fn accepts(&self, target: &IkTarget, chain: &KinematicChain, q: &[f64]) -> bool {
        let (pos_err, ang_err) = target.error_to(&chain.forward_kinematics(q));
        pos_err <= self.position_tolerance && ang_err <= self.angle_tolerance
    }
}

impl SuccessRateEvaluator for RandomConfigEvaluator {
    fn evaluate(
        &self,
        chain: &KinematicChain,
        handle: &SolverHandle,
        samples: usize,
    ) -> SuccessReport {
        let positions = |ids: &[usize]| -> Option<Vec<usize>> {
            ids.iter().map(|&id| chain.position_of(id)).collect()
        };
        let (Some(solve_pos), Some(free_pos)) =
            (positions(handle.solve_joints()), positions(handle.free_joints()))
        else {
            return SuccessReport {
                samples,
                successes: 0,
            };
        };

        let solver = handle.solver();
        let problem = solver.problem_type();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut successes = 0;

        for i in 0..samples {
            let q = Self::sample(chain, &mut rng);
            let target = IkTarget::from_pose(problem, &chain.forward_kinematics(&q));
            let free: Vec<f64> = free_pos.iter().map(|&p| q[p]).collect();

            let solved = solver.solve(&target, &free).iter().any(|solution| {
                if solution.len() != solve_pos.len() {
                    return false;
                }
                let mut candidate = q.clone();
                for (&p, &v) in solve_pos.iter().zip(solution) {
                    candidate[p] = v;
                }
                self.accepts(&target, chain, &candidate)
            });
            if solved {
                successes += 1;
            } else {
                debug!(sample = i, ?q, "no valid ik solution");
            }
        }

        let report = SuccessReport { samples, successes };
        info!(
            key = %handle.name(),
            samples,
            successes,
            rate = report.rate(),
            "ik success rate"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use approx::assert_relative_eq;
    use ikforge_build::{CacheKey, partition};
    use ikforge_core::ProblemType;

    use crate::reference::{DlsConfig, ReferenceSolver};
    use crate::solver::IkSolver;

    const URDF: &str = r#"
        <robot name="pan_tilt">
            <link name="base"/><link name="pan"/><link name="tilt"/><link name="cam"/>
            <joint name="j_pan" type="revolute">
                <parent link="base"/><child link="pan"/>
                <axis xyz="0 0 1"/>
                <limit lower="-2.5" upper="2.5" effort="1" velocity="1"/>
            </joint>
            <joint name="j_tilt" type="revolute">
                <parent link="pan"/><child link="tilt"/>
                <origin xyz="0 0 0.1"/>
                <axis xyz="0 1 0"/>
                <limit lower="-1.2" upper="1.2" effort="1" velocity="1"/>
            </joint>
            <joint name="cam_fixed" type="fixed">
                <parent link="tilt"/><child link="cam"/>
                <origin xyz="0 0 0.05"/>
            </joint>
        </robot>
    "#;

    struct NeverSolves;

    impl IkSolver for NeverSolves {
        fn num_joints(&self) -> usize {
            2
        }
        fn num_free_parameters(&self) -> usize {
            0
        }
        fn problem_type(&self) -> ProblemType {
            ProblemType::Direction3D
        }
        fn init(&self, _chain: &KinematicChain) -> bool {
            true
        }
        fn solve(&self, _target: &IkTarget, _free: &[f64]) -> Vec<Vec<f64>> {
            vec![vec![0.0, 0.0]]
        }
    }

    fn setup() -> (KinematicChain, CacheKey) {
        let model = ikforge_urdf::parse_string(URDF).unwrap();
        let chain = KinematicChain::from_model(&model, "base", "cam").unwrap();
        let p = partition(&chain.joint_ids(), 2, None).unwrap();
        let key = ikforge_build::derive_key(&chain, "head", ProblemType::Direction3D, &p);
        (chain, key)
    }

    #[test]
    fn reference_solver_scores_high() {
        let (chain, key) = setup();
        let solver = ReferenceSolver::new(
            ProblemType::Direction3D,
            key.solve_joints().to_vec(),
            key.free_joints().to_vec(),
            DlsConfig::default(),
        );
        assert!(solver.init(&chain));
        let handle = SolverHandle::new(key, Arc::new(solver));
        let report = RandomConfigEvaluator::new(7).evaluate(&chain, &handle, 20);
        assert_eq!(report.samples, 20);
        assert!(report.rate() >= 0.9, "rate {}", report.rate());
    }

    #[test]
    fn wrong_answers_score_low() {
        let (chain, key) = setup();
        let handle = SolverHandle::new(key, Arc::new(NeverSolves));
        let report = RandomConfigEvaluator::new(7).evaluate(&chain, &handle, 20);
        assert!(report.rate() < 0.5);
        assert!(!report.passes(0.95));
    }

    #[test]
    fn evaluation_is_deterministic_per_seed() {
        let (chain, key) = setup();
        let handle = SolverHandle::new(key, Arc::new(NeverSolves));
        let a = RandomConfigEvaluator::new(3).evaluate(&chain, &handle, 10);
        let b = RandomConfigEvaluator::new(3).evaluate(&chain, &handle, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn report_rate() {
        let r = SuccessReport {
            samples: 4,
            successes: 3,
        };
        assert_relative_eq!(r.rate(), 0.75);
        assert!(r.passes(0.75));
        assert!(!r.passes(0.8));
        let empty = SuccessReport {
            samples: 0,
            successes: 0,
        };
        assert_relative_eq!(empty.rate(), 0.0);
        assert!(!empty.passes(0.0));
    }
}
