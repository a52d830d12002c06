//! Build side of ikforge: from a kinematic chain to a cached native solver.
//!
//! # Architecture
//!
//! ```text
//! KinematicChain ──► partition ──► CacheKey ──► BuildPipeline ──► BuildArtifact
//!                                                 │
//!                                   Generator ────┤ (source text)
//!                                   Toolchain ────┘ (compile + link)
//! ```
//!
//! Artifacts live on disk under a per-robot directory. Their presence is the
//! cache: a source file is regenerated only when missing or forced, and the
//! shared library is rebuilt only when missing, forced, or its source changed
//! in the same call. Files are published with write-to-temp-then-rename.

pub mod cache_key;
pub mod generator;
pub mod partition;
pub mod pipeline;
pub mod process;
pub mod publish;
pub mod toolchain;
pub mod validate;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use cache_key::{BuildArtifact, CacheKey, artifact_paths, derive_key};
pub use generator::{CommandGenerator, GenerationRequest, Generator};
pub use partition::{FreeJointPolicy, JointPartition, partition, partition_with_policy};
pub use pipeline::{BuildPipeline, BuildRequest};
pub use process::CancelToken;
pub use toolchain::{CcToolchain, Toolchain};
pub use validate::validate_dof;
