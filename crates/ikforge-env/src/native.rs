//! Compiled solver libraries opened with `libloading`.
//!
//! Generated sources built with the library macro export a plain C ABI:
//!
//! ```c
//! int ik_num_joints(void);
//! int ik_num_free_parameters(void);
//! int ik_problem_type(void);   /* 0 = 6d, 1 = r3d, 2 = d2d, 3 = t3d */
//! int ik_solve(const double *trans,   /* [3] */
//!              const double *rot,     /* [9], row-major */
//!              const double *free,    /* [ik_num_free_parameters()] */
//!              double *solutions,     /* [max_solutions * ik_num_joints()] */
//!              int max_solutions);    /* returns the number written */
//! ```
//!
//! Targets are packed per problem type: a pose fills both `trans` and `rot`,
//! a rotation fills `rot`, a direction fills `rot[0..3]`, a translation fills
//! `trans`. Unused slots are zero.

use std::ffi::c_int;
use std::path::Path;
use std::sync::Arc;

use ikforge_core::{IkTarget, ProblemType};
use ikforge_urdf::KinematicChain;
use libloading::Library;
use nalgebra::Matrix3;
use tracing::debug;

use crate::registry::{IkLibrary, LibraryError, LibraryLoader};
use crate::solver::IkSolver;

const MAX_SOLUTIONS: usize = 64;

type CountFn = unsafe extern "C" fn() -> c_int;
type SolveFn = unsafe extern "C" fn(*const f64, *const f64, *const f64, *mut f64, c_int) -> c_int;

#[derive(Clone, Copy)]
struct EntryPoints {
    num_joints: CountFn,
    num_free_parameters: CountFn,
    problem_type: CountFn,
    solve: SolveFn,
}

// ---------------------------------------------------------------------------
// NativeLoader
// ---------------------------------------------------------------------------

/// Opens shared libraries from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeLoader;

impl LibraryLoader for NativeLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn IkLibrary>, LibraryError> {
        Ok(Arc::new(NativeLibrary::open(path)?))
    }
}

/// An opened solver library with its entry points resolved.
pub struct NativeLibrary {
    library: Arc<Library>,
    entry: EntryPoints,
}

impl NativeLibrary {
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        // SAFETY: loading runs the library's initializers. Solver libraries
        // are produced by our own build pipeline.
        let library = unsafe { Library::new(path) }.map_err(|e| LibraryError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let entry = EntryPoints {
            num_joints: symbol(&library, "ik_num_joints")?,
            num_free_parameters: symbol(&library, "ik_num_free_parameters")?,
            problem_type: symbol(&library, "ik_problem_type")?,
            solve: symbol(&library, "ik_solve")?,
        };
        debug!(path = %path.display(), "opened native ik library");

        Ok(Self {
            library: Arc::new(library),
            entry,
        })
    }
}

fn symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T, LibraryError> {
    let mut bytes = name.as_bytes().to_vec();
    bytes.push(0);
    // SAFETY: `T` is the fn pointer type of the documented ABI. The copied
    // pointer is only used while `library` is kept alive by the solver.
    unsafe { library.get::<T>(&bytes) }
        .map(|s| *s)
        .map_err(|e| LibraryError::MissingSymbol {
            symbol: name,
            message: e.to_string(),
        })
}

impl IkLibrary for NativeLibrary {
    fn create_solver(&self) -> Option<Arc<dyn IkSolver>> {
        // SAFETY: argument-free queries of the documented ABI.
        let (joints, free, code) = unsafe {
            (
                (self.entry.num_joints)(),
                (self.entry.num_free_parameters)(),
                (self.entry.problem_type)(),
            )
        };
        let solver = NativeSolver {
            _library: Arc::clone(&self.library),
            entry: self.entry,
            num_joints: usize::try_from(joints).ok().filter(|&n| n > 0)?,
            num_free: usize::try_from(free).ok()?,
            problem_type: ProblemType::from_abi_code(code)?,
        };
        Some(Arc::new(solver))
    }
}

// ---------------------------------------------------------------------------
// NativeSolver
// ---------------------------------------------------------------------------

struct NativeSolver {
    _library: Arc<Library>,
    entry: EntryPoints,
    num_joints: usize,
    num_free: usize,
    problem_type: ProblemType,
}

impl IkSolver for NativeSolver {
    fn num_joints(&self) -> usize {
        self.num_joints
    }

    fn num_free_parameters(&self) -> usize {
        self.num_free
    }

    fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    fn init(&self, chain: &KinematicChain) -> bool {
        self.num_joints == self.problem_type.expected_dof()
            && self.num_joints + self.num_free == chain.dof()
    }

    fn solve(&self, target: &IkTarget, free: &[f64]) -> Vec<Vec<f64>> {
        if target.problem_type() != self.problem_type || free.len() != self.num_free {
            return Vec::new();
        }
        let (trans, rot) = pack_target(target);
        let mut out = vec![0.0; MAX_SOLUTIONS * self.num_joints];
        // SAFETY: buffers match the sizes declared by the ABI: 3, 9,
        // num_free and MAX_SOLUTIONS * num_joints doubles.
        let written = unsafe {
            (self.entry.solve)(
                trans.as_ptr(),
                rot.as_ptr(),
                free.as_ptr(),
                out.as_mut_ptr(),
                c_int::try_from(MAX_SOLUTIONS).unwrap_or(c_int::MAX),
            )
        };
        let count = usize::try_from(written).unwrap_or(0).min(MAX_SOLUTIONS);
        out.chunks_exact(self.num_joints)
            .take(count)
            .map(<[f64]>::to_vec)
            .collect()
    }
}

/// Pack a target into the `trans[3]` / `rot[9]` argument layout.
fn pack_target(target: &IkTarget) -> ([f64; 3], [f64; 9]) {
    let mut trans = [0.0; 3];
    let mut rot = [0.0; 9];
    match target {
        IkTarget::Pose(pose) => {
            trans.copy_from_slice(pose.translation.vector.as_slice());
            rot = row_major(pose.rotation.to_rotation_matrix().matrix());
        }
        IkTarget::Rotation(q) => rot = row_major(q.to_rotation_matrix().matrix()),
        IkTarget::Direction(d) => rot[..3].copy_from_slice(d.as_slice()),
        IkTarget::Translation(t) => trans.copy_from_slice(t.as_slice()),
    }
    (trans, rot)
}

fn row_major(m: &Matrix3<f64>) -> [f64; 9] {
    let mut out = [0.0; 9];
    for r in 0..3 {
        for c in 0..3 {
            out[r * 3 + c] = m[(r, c)];
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Isometry3, UnitQuaternion, UnitVector3, Vector3};

    #[test]
    fn missing_library_is_open_error() {
        let err = NativeLoader
            .open(Path::new("/nonexistent/libikfast.so"))
            .err()
            .unwrap();
        assert!(matches!(err, LibraryError::Open { .. }));
    }

    #[test]
    fn pose_packing_is_row_major() {
        let rot = UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2);
        let pose = Isometry3::from_parts(Vector3::new(1.0, 2.0, 3.0).into(), rot);
        let (trans, m) = pack_target(&IkTarget::Pose(pose));
        assert_eq!(trans, [1.0, 2.0, 3.0]);
        // Rz(90): first row is [0, -1, 0].
        assert!((m[0]).abs() < 1e-12);
        assert!((m[1] + 1.0).abs() < 1e-12);
        assert!((m[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn direction_and_translation_packing() {
        let d = UnitVector3::new_normalize(Vector3::new(0.0, 1.0, 0.0));
        let (trans, rot) = pack_target(&IkTarget::Direction(d));
        assert_eq!(trans, [0.0; 3]);
        assert_eq!(&rot[..3], &[0.0, 1.0, 0.0]);
        assert!(rot[3..].iter().all(|&v| v == 0.0));

        let (trans, rot) = pack_target(&IkTarget::Translation(Vector3::new(4.0, 5.0, 6.0)));
        assert_eq!(trans, [4.0, 5.0, 6.0]);
        assert_eq!(rot, [0.0; 9]);
    }
}
