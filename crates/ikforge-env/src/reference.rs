//! Damped Least Squares (Levenberg-Marquardt) reference solver.
//!
//! Numerically solves any [`ProblemType`] for the solve joints of a
//! partition, holding the free joints at the values passed to
//! [`IkSolver::solve`]. Used to cross-check generated solvers and as a
//! stand-in library when no native toolchain is available.

use std::sync::{Arc, RwLock};

use ikforge_build::CacheKey;
use ikforge_core::{IkTarget, JointId, ProblemType};
use ikforge_urdf::KinematicChain;
use nalgebra::{DMatrix, DVector, Isometry3, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::registry::IkLibrary;
use crate::solver::IkSolver;

/// Configuration for the DLS solver.
#[derive(Debug, Clone)]
pub struct DlsConfig {
    /// Maximum iterations per attempt.
    pub max_iterations: u32,
    /// Position error tolerance (meters).
    pub position_tolerance: f64,
    /// Orientation error tolerance (radians).
    pub angle_tolerance: f64,
    /// Damping factor (lambda). Higher = more robust near singularities,
    /// but slower convergence.
    pub damping: f64,
    /// Extra attempts from seeded random starts after the first attempt
    /// from the middle of the joint ranges.
    pub restarts: u32,
}

impl Default for DlsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            position_tolerance: 1e-4,
            angle_tolerance: 1e-3,
            damping: 0.01,
            restarts: 8,
        }
    }
}

/// Chain positions resolved at init.
struct Binding {
    chain: KinematicChain,
    solve_pos: Vec<usize>,
    free_pos: Vec<usize>,
}

/// DLS solver for one partition.
pub struct ReferenceSolver {
    problem_type: ProblemType,
    solve_joints: Vec<JointId>,
    free_joints: Vec<JointId>,
    config: DlsConfig,
    binding: RwLock<Option<Binding>>,
}

impl ReferenceSolver {
    pub fn new(
        problem_type: ProblemType,
        solve_joints: Vec<JointId>,
        free_joints: Vec<JointId>,
        config: DlsConfig,
    ) -> Self {
        Self {
            problem_type,
            solve_joints,
            free_joints,
            config,
            binding: RwLock::new(None),
        }
    }

    fn attempt(&self, binding: &Binding, target: &IkTarget, q_init: Vec<f64>) -> Option<Vec<f64>> {
        let chain = &binding.chain;
        let mut q = q_init;

        for _ in 0..=self.config.max_iterations {
            let (origins, axes, ee) = chain.joint_frames(&q);
            let (pos_err, ang_err) = target.error_to(&ee);
            if pos_err < self.config.position_tolerance && ang_err < self.config.angle_tolerance {
                return Some(binding.solve_pos.iter().map(|&p| q[p]).collect());
            }

            let error = error_vector(&ee, target);
            let jacobian = jacobian(chain, &binding.solve_pos, &origins, &axes, &ee, target);
            let m = jacobian.nrows();

            // DLS: dq = J^T (J J^T + lambda^2 I)^{-1} * error
            let jjt = &jacobian * jacobian.transpose();
            let damped = jjt + DMatrix::identity(m, m) * (self.config.damping * self.config.damping);
            let damped_inv = damped.try_inverse()?;
            let dq = jacobian.transpose() * damped_inv * error;

            for (k, &p) in binding.solve_pos.iter().enumerate() {
                q[p] += dq[k];
            }
            chain.clamp_joints(&mut q);
        }
        None
    }
}

impl IkSolver for ReferenceSolver {
    fn num_joints(&self) -> usize {
        self.solve_joints.len()
    }

    fn num_free_parameters(&self) -> usize {
        self.free_joints.len()
    }

    fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    fn init(&self, chain: &KinematicChain) -> bool {
        let positions = |ids: &[JointId]| -> Option<Vec<usize>> {
            ids.iter().map(|&id| chain.position_of(id)).collect()
        };
        let (Some(solve_pos), Some(free_pos)) =
            (positions(&self.solve_joints), positions(&self.free_joints))
        else {
            return false;
        };
        if solve_pos.len() != self.problem_type.expected_dof()
            || solve_pos.len() + free_pos.len() != chain.dof()
        {
            return false;
        }
        let Ok(mut binding) = self.binding.write() else {
            return false;
        };
        *binding = Some(Binding {
            chain: chain.clone(),
            solve_pos,
            free_pos,
        });
        true
    }

    fn solve(&self, target: &IkTarget, free: &[f64]) -> Vec<Vec<f64>> {
        let Ok(guard) = self.binding.read() else {
            return Vec::new();
        };
        let Some(binding) = guard.as_ref() else {
            return Vec::new();
        };
        if target.problem_type() != self.problem_type || free.len() != binding.free_pos.len() {
            return Vec::new();
        }

        let joints = binding.chain.joints();
        let mut start: Vec<f64> = joints
            .iter()
            .map(|j| 0.5 * (j.lower_limit + j.upper_limit))
            .collect();
        for (&p, &value) in binding.free_pos.iter().zip(free) {
            start[p] = value;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for attempt in 0..=self.config.restarts {
            let mut q = start.clone();
            if attempt > 0 {
                for &p in &binding.solve_pos {
                    let j = &joints[p];
                    q[p] = j.lower_limit + (j.upper_limit - j.lower_limit) * rng.r#gen::<f64>();
                }
            }
            if let Some(solution) = self.attempt(binding, target, q) {
                return vec![solution];
            }
        }
        Vec::new()
    }
}

/// Library producing [`ReferenceSolver`]s for one partition.
pub struct ReferenceLibrary {
    problem_type: ProblemType,
    solve_joints: Vec<JointId>,
    free_joints: Vec<JointId>,
}

impl ReferenceLibrary {
    pub const fn new(
        problem_type: ProblemType,
        solve_joints: Vec<JointId>,
        free_joints: Vec<JointId>,
    ) -> Self {
        Self {
            problem_type,
            solve_joints,
            free_joints,
        }
    }

    /// Library for the partition and problem type of `key`.
    pub fn for_key(key: &CacheKey) -> Self {
        Self::new(
            key.problem_type,
            key.solve_joints().to_vec(),
            key.free_joints().to_vec(),
        )
    }
}

impl IkLibrary for ReferenceLibrary {
    fn create_solver(&self) -> Option<Arc<dyn IkSolver>> {
        Some(Arc::new(ReferenceSolver::new(
            self.problem_type,
            self.solve_joints.clone(),
            self.free_joints.clone(),
            DlsConfig::default(),
        )))
    }
}

// ---------------------------------------------------------------------------
// Error and Jacobian
// ---------------------------------------------------------------------------

/// Task-space error between the current end-effector pose and the target.
fn error_vector(ee: &Isometry3<f64>, target: &IkTarget) -> DVector<f64> {
    match target {
        IkTarget::Pose(t) => {
            let p = t.translation.vector - ee.translation.vector;
            let w = orientation_error(&(t.rotation * ee.rotation.inverse()));
            DVector::from_column_slice(&[p.x, p.y, p.z, w.x, w.y, w.z])
        }
        IkTarget::Translation(t) => {
            let p = t - ee.translation.vector;
            DVector::from_column_slice(&[p.x, p.y, p.z])
        }
        IkTarget::Rotation(r) => {
            let w = orientation_error(&(*r * ee.rotation.inverse()));
            DVector::from_column_slice(&[w.x, w.y, w.z])
        }
        IkTarget::Direction(d) => {
            let z = ee.rotation * Vector3::z();
            let w = UnitQuaternion::rotation_between(&z, &d.into_inner())
                .map_or_else(Vector3::zeros, |q| orientation_error(&q));
            DVector::from_column_slice(&[w.x, w.y, w.z])
        }
    }
}

/// Extract orientation error as a 3-vector (axis * angle) from a unit quaternion.
fn orientation_error(q: &UnitQuaternion<f64>) -> Vector3<f64> {
    q.axis()
        .map_or_else(Vector3::zeros, |axis| axis.into_inner() * q.angle())
}

/// Geometric Jacobian restricted to the solve joints.
///
/// Rows are linear then angular for poses, linear only for translations and
/// angular only for rotations and directions.
fn jacobian(
    chain: &KinematicChain,
    solve_pos: &[usize],
    origins: &[Vector3<f64>],
    axes: &[Vector3<f64>],
    ee: &Isometry3<f64>,
    target: &IkTarget,
) -> DMatrix<f64> {
    let (linear, angular) = match target {
        IkTarget::Pose(_) => (true, true),
        IkTarget::Translation(_) => (true, false),
        IkTarget::Rotation(_) | IkTarget::Direction(_) => (false, true),
    };
    let rows = 3 * (usize::from(linear) + usize::from(angular));
    let mut j = DMatrix::zeros(rows, solve_pos.len());
    let ee_pos = ee.translation.vector;

    for (col, &p) in solve_pos.iter().enumerate() {
        let z = axes[p];
        let (lin, ang) = if chain.joints()[p].is_prismatic {
            (z, Vector3::zeros())
        } else {
            (z.cross(&(ee_pos - origins[p])), z)
        };
        let mut row = 0;
        if linear {
            j.fixed_view_mut::<3, 1>(row, col).copy_from(&lin);
            row += 3;
        }
        if angular {
            j.fixed_view_mut::<3, 1>(row, col).copy_from(&ang);
        }
    }
    j
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
