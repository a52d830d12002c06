//! The environment that owns manipulators and the solver registry.
//!
//! The registry maps a solver name (textual cache key) to an opened library.
//! It belongs to one [`Environment`] and is dropped with it; there is no
//! process-wide registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ikforge_urdf::KinematicChain;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::solver::IkSolver;

// ---------------------------------------------------------------------------
// Library loading seam
// ---------------------------------------------------------------------------

/// Failure to open a solver library.
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("cannot open {path}: {message}")]
    Open { path: PathBuf, message: String },

    #[error("missing entry point {symbol}: {message}")]
    MissingSymbol {
        symbol: &'static str,
        message: String,
    },
}

/// An opened solver library.
pub trait IkLibrary: Send + Sync {
    /// Instantiate a solver, or `None` if the library cannot produce one.
    fn create_solver(&self) -> Option<Arc<dyn IkSolver>>;
}

/// Opens solver libraries from disk.
pub trait LibraryLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn IkLibrary>, LibraryError>;
}

// ---------------------------------------------------------------------------
// SolverRegistry
// ---------------------------------------------------------------------------

struct RegisteredLibrary {
    path: PathBuf,
    library: Arc<dyn IkLibrary>,
}

/// Named solver libraries of one environment.
pub struct SolverRegistry {
    loader: Box<dyn LibraryLoader>,
    libraries: HashMap<String, RegisteredLibrary>,
}

impl SolverRegistry {
    pub fn new(loader: Box<dyn LibraryLoader>) -> Self {
        Self {
            loader,
            libraries: HashMap::new(),
        }
    }

    /// Open `path` and register it under `name`.
    ///
    /// Re-registering an existing name replaces the previous entry.
    pub fn register_library(&mut self, name: &str, path: &Path) -> Result<(), LibraryError> {
        let library = self.loader.open(path)?;
        if self
            .libraries
            .insert(
                name.to_owned(),
                RegisteredLibrary {
                    path: path.to_path_buf(),
                    library,
                },
            )
            .is_some()
        {
            warn!(%name, "replaced registered ik library");
        } else {
            info!(%name, path = %path.display(), "registered ik library");
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    /// Path a name was registered from.
    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.libraries.get(name).map(|l| l.path.as_path())
    }

    /// Instantiate a solver from the library registered under `name`.
    pub fn create_solver(&self, name: &str) -> Option<Arc<dyn IkSolver>> {
        self.libraries.get(name)?.library.create_solver()
    }

    /// Drop a registration. Solvers already created stay valid.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.libraries.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.libraries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Manipulator
// ---------------------------------------------------------------------------

struct AttachedSolver {
    name: String,
    solver: Arc<dyn IkSolver>,
}

/// A named chain with at most one active IK solver.
pub struct Manipulator {
    name: String,
    chain: KinematicChain,
    solver: Option<AttachedSolver>,
}

impl Manipulator {
    pub fn new(name: impl Into<String>, chain: KinematicChain) -> Self {
        Self {
            name: name.into(),
            chain,
            solver: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    /// Replace the active solver with `solver` and initialize it.
    ///
    /// The previous solver is detached first. On initialization failure
    /// nothing stays attached and `false` is returned.
    pub fn attach_solver(&mut self, name: &str, solver: Arc<dyn IkSolver>) -> bool {
        self.solver = None;
        if !solver.init(&self.chain) {
            warn!(manipulator = %self.name, solver = %name, "ik solver init failed");
            return false;
        }
        debug!(manipulator = %self.name, solver = %name, "attached ik solver");
        self.solver = Some(AttachedSolver {
            name: name.to_owned(),
            solver,
        });
        true
    }

    pub const fn has_solver(&self) -> bool {
        self.solver.is_some()
    }

    pub fn solver_name(&self) -> Option<&str> {
        self.solver.as_ref().map(|s| s.name.as_str())
    }

    pub fn solver(&self) -> Option<&Arc<dyn IkSolver>> {
        self.solver.as_ref().map(|s| &s.solver)
    }

    /// Remove the active solver, returning whether one was attached.
    pub fn detach_solver(&mut self) -> bool {
        self.solver.take().is_some()
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Owner of manipulators and the solver registry.
pub struct Environment {
    registry: SolverRegistry,
    manipulators: HashMap<String, Manipulator>,
}

impl Environment {
    pub fn new(loader: Box<dyn LibraryLoader>) -> Self {
        Self {
            registry: SolverRegistry::new(loader),
            manipulators: HashMap::new(),
        }
    }

    /// Add (or replace) a manipulator spanning `chain`.
    pub fn add_manipulator(&mut self, name: impl Into<String>, chain: KinematicChain) {
        let name = name.into();
        self.manipulators
            .insert(name.clone(), Manipulator::new(name, chain));
    }

    pub fn manipulator(&self, name: &str) -> Option<&Manipulator> {
        self.manipulators.get(name)
    }

    pub fn manipulator_mut(&mut self, name: &str) -> Option<&mut Manipulator> {
        self.manipulators.get_mut(name)
    }

    pub const fn registry(&self) -> &SolverRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SolverRegistry {
        &mut self.registry
    }

    /// Split borrow used when registering and attaching in one step.
    pub fn parts_mut(&mut self, manipulator: &str) -> (&mut SolverRegistry, Option<&mut Manipulator>) {
        (&mut self.registry, self.manipulators.get_mut(manipulator))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
