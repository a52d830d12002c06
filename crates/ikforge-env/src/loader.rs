//! Registering built libraries and attaching solvers to manipulators.

use std::path::Path;

use ikforge_build::CacheKey;
use ikforge_core::ForgeError;
use tracing::info;

use crate::registry::Environment;
use crate::solver::SolverHandle;

/// Make the solver for `key` the active solver of `manipulator`.
///
/// Reuses the attached solver when the manipulator already runs one registered
/// under `key`. Otherwise the library is registered (unless the registry
/// already knows `key`), a solver is instantiated and attached, and its
/// initialization is checked.
pub fn load(
    env: &mut Environment,
    manipulator: &str,
    key: &CacheKey,
    library_path: &Path,
) -> Result<SolverHandle, ForgeError> {
    let name = key.to_string();
    let load_failed = |message: String| ForgeError::LoadFailed {
        name: name.clone(),
        path: library_path.to_path_buf(),
        message,
    };

    let (registry, manip) = env.parts_mut(manipulator);
    let manip =
        manip.ok_or_else(|| load_failed(format!("environment has no manipulator {manipulator}")))?;

    let attached = manip
        .solver()
        .filter(|_| manip.solver_name() == Some(name.as_str()));
    if let Some(solver) = attached {
        info!(key = %name, %manipulator, "reusing attached ik solver");
        return Ok(SolverHandle::new(key.clone(), solver.clone()));
    }

    if registry.contains(&name) {
        info!(key = %name, "ik library already registered");
    } else {
        registry
            .register_library(&name, library_path)
            .map_err(|e| load_failed(e.to_string()))?;
    }

    let solver = registry
        .create_solver(&name)
        .ok_or_else(|| load_failed("registry returned no solver".into()))?;

    if !manip.attach_solver(&name, solver.clone()) {
        return Err(ForgeError::InitFailed {
            name,
            manipulator: manipulator.to_owned(),
        });
    }
    info!(key = %name, %manipulator, "ik solver attached");
    Ok(SolverHandle::new(key.clone(), solver))
}

/// Whether `handle` is usable: present, and its manipulator still runs it.
pub fn has(env: &Environment, manipulator: &str, handle: Option<&SolverHandle>) -> bool {
    let Some(handle) = handle else {
        return false;
    };
    env.manipulator(manipulator).is_some_and(|m| {
        m.has_solver() && m.solver_name() == Some(handle.name().as_str())
    })
}
