//! Runtime side of ikforge: loading built solvers into an environment.
//!
//! An [`Environment`] owns manipulators and a [`SolverRegistry`] of opened
//! libraries keyed by their textual cache key. The [`loader`] registers a
//! built library, instantiates an [`IkSolver`] and attaches it to a
//! manipulator. [`IkModel`] strings the whole flow together, and
//! [`RandomConfigEvaluator`] measures how often a loaded solver succeeds.

pub mod evaluate;
pub mod loader;
pub mod model;
pub mod native;
pub mod reference;
pub mod registry;
pub mod solver;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use evaluate::{RandomConfigEvaluator, SuccessRateEvaluator, SuccessReport};
pub use loader::{has, load};
pub use model::IkModel;
pub use native::{NativeLibrary, NativeLoader};
pub use reference::{DlsConfig, ReferenceLibrary, ReferenceSolver};
pub use registry::{Environment, IkLibrary, LibraryError, LibraryLoader, Manipulator, SolverRegistry};
pub use solver::{IkSolver, SolverHandle};
