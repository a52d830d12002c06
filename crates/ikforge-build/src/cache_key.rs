//! Cache keys and the artifact file layout derived from them.
//!
//! ```text
//! <output_dir>/<fingerprint>/<prefix>ikfast.<manip>.<tag>_<solve>[_f<free>].cpp
//! <output_dir>/<fingerprint>/<prefix>ikfast.<manip>.<tag>_<solve>[_f<free>]<suffix>
//! ```
//!
//! `<prefix>`/`<suffix>` are the platform shared-library conventions reported
//! by the [`Toolchain`]; the source shares the library's prefixed stem. Path
//! derivation never touches the filesystem.

use std::fmt;
use std::path::{Path, PathBuf};

use ikforge_core::{JointId, ProblemType};
use ikforge_urdf::KinematicChain;

use crate::partition::JointPartition;
use crate::toolchain::Toolchain;

// ---------------------------------------------------------------------------
// CacheKey
// ---------------------------------------------------------------------------

/// Identity of one generated solver.
///
/// Equal keys produce identical generated source (for a deterministic
/// generator) and may share a compiled library. The [`Display`](fmt::Display)
/// form is the name the solver is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: String,
    pub manipulator: String,
    pub problem_type: ProblemType,
    pub partition: JointPartition,
}

impl CacheKey {
    /// `ikfast.<manip>.<tag>`, shared by every partition of a manipulator.
    pub fn basename(&self) -> String {
        format!("ikfast.{}.{}", self.manipulator, self.problem_type.tag())
    }

    pub fn solve_joints(&self) -> &[JointId] {
        self.partition.solve_joints()
    }

    pub fn free_joints(&self) -> &[JointId] {
        self.partition.free_joints()
    }

    /// File stem shared by the source and the library.
    pub fn artifact_stem(&self) -> String {
        format!("{}{}", self.basename(), self.partition.suffix())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ikfast.{}.{}.{}{}",
            self.fingerprint,
            self.manipulator,
            self.problem_type.tag(),
            self.partition.suffix()
        )
    }
}

/// Derive the cache key of a generation request.
pub fn derive_key(
    chain: &KinematicChain,
    manipulator: &str,
    problem_type: ProblemType,
    partition: &JointPartition,
) -> CacheKey {
    CacheKey {
        fingerprint: chain.fingerprint().to_owned(),
        manipulator: manipulator.to_owned(),
        problem_type,
        partition: partition.clone(),
    }
}

// ---------------------------------------------------------------------------
// BuildArtifact
// ---------------------------------------------------------------------------

/// Where the generated source and compiled library of a key live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub source_path: PathBuf,
    pub library_path: PathBuf,
}

impl BuildArtifact {
    /// Per-robot directory holding both files.
    pub fn model_dir(&self) -> &Path {
        self.library_path.parent().unwrap_or_else(|| Path::new("."))
    }
}

/// Map a key to its source and library paths under `output_dir`.
pub fn artifact_paths(key: &CacheKey, output_dir: &Path, toolchain: &dyn Toolchain) -> BuildArtifact {
    let model_dir = output_dir.join(&key.fingerprint);
    let stem = key.artifact_stem();
    let library_name = toolchain.shared_library_filename(&stem);
    let prefix = library_name
        .split_once(stem.as_str())
        .map_or("", |(prefix, _)| prefix);
    BuildArtifact {
        source_path: model_dir.join(format!("{prefix}{stem}.{}", toolchain.source_extension())),
        library_path: model_dir.join(&library_name),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
