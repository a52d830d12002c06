//! The solver interface shared by native and reference solvers.

use std::fmt;
use std::sync::Arc;

use ikforge_build::CacheKey;
use ikforge_core::{IkTarget, JointId, ProblemType};
use ikforge_urdf::KinematicChain;

/// An analytic (or numeric) IK solver for one chain partition.
///
/// Solutions hold values for the solve joints only, in chain order. Free
/// joint values are inputs, given in the order of the partition's free list.
pub trait IkSolver: Send + Sync {
    /// Number of solve joints.
    fn num_joints(&self) -> usize;

    /// Number of free parameters expected by [`solve`](Self::solve).
    fn num_free_parameters(&self) -> usize;

    /// The constraint this solver was generated for.
    fn problem_type(&self) -> ProblemType;

    /// Bind the solver to `chain`. Returns `false` if the solver cannot
    /// serve it (shape mismatch, unsupported joints, ...).
    fn init(&self, chain: &KinematicChain) -> bool;

    /// Every solution found for `target` with the free joints fixed at `free`.
    /// Empty when the target is unreachable.
    fn solve(&self, target: &IkTarget, free: &[f64]) -> Vec<Vec<f64>>;
}

/// A loaded solver together with the key it was built and registered under.
///
/// Cheap to clone. The solver stays alive while any handle or the
/// manipulator it is attached to holds it.
#[derive(Clone)]
pub struct SolverHandle {
    key: CacheKey,
    solver: Arc<dyn IkSolver>,
}

impl SolverHandle {
    pub fn new(key: CacheKey, solver: Arc<dyn IkSolver>) -> Self {
        Self { key, solver }
    }

    /// Registry name (textual cache key).
    pub fn name(&self) -> String {
        self.key.to_string()
    }

    pub const fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn solve_joints(&self) -> &[JointId] {
        self.key.solve_joints()
    }

    pub fn free_joints(&self) -> &[JointId] {
        self.key.free_joints()
    }

    pub fn solver(&self) -> &Arc<dyn IkSolver> {
        &self.solver
    }
}

impl fmt::Debug for SolverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverHandle")
            .field("key", &self.key.to_string())
            .field("problem_type", &self.solver.problem_type())
            .finish_non_exhaustive()
    }
}
