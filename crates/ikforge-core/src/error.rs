use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::JointId;

/// External stage that can time out or be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Symbolic source generation.
    Generate,
    /// Native compilation of the generated source.
    Compile,
    /// Linking object files into the shared library.
    Link,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Compile => "compile",
            Self::Link => "link",
        })
    }
}

/// Top-level error type for deriving, building and loading IK solvers.
///
/// Nothing is retried: every variant is surfaced to the caller as soon as it
/// happens. A cached artifact that fails to load is not regenerated.
#[derive(Debug, Error)]
pub enum ForgeError {
    /// Bad DOF / problem type / joint-count combination.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An explicit free joint is not part of the chain.
    #[error("Unknown joint {joint}: not in chain {chain:?}")]
    UnknownJoint { joint: JointId, chain: Vec<JointId> },

    /// The generator produced no usable source.
    #[error("Failed to generate ik solver for {target}: {message}")]
    GenerationFailed { target: String, message: String },

    /// Native compilation failed. `diagnostics` is the toolchain output, unmodified.
    #[error("Compile failed for {path}:\n{diagnostics}")]
    CompileFailed { path: PathBuf, diagnostics: String },

    /// Linking failed. `diagnostics` is the toolchain output, unmodified.
    #[error("Link failed for {path}:\n{diagnostics}")]
    LinkFailed { path: PathBuf, diagnostics: String },

    /// The environment could not register the library or create a solver from it.
    #[error("Failed to load ik library {name} from {path}: {message}")]
    LoadFailed {
        name: String,
        path: PathBuf,
        message: String,
    },

    /// The solver was attached but its initialization reported failure.
    #[error("Ik solver {name} failed to initialize on manipulator {manipulator}")]
    InitFailed { name: String, manipulator: String },

    /// An external stage exceeded its time budget.
    #[error("{stage} stage timed out after {secs}s")]
    Timeout { stage: Stage, secs: u64 },

    /// An external stage was cancelled by the caller.
    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },

    /// Filesystem failure while reading or publishing artifacts.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl ForgeError {
    /// Stable short name of the failure kind, used in CLI output.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidConfiguration(_) => "InvalidConfiguration",
            Self::UnknownJoint { .. } => "UnknownJoint",
            Self::GenerationFailed { .. } => "GenerationFailed",
            Self::CompileFailed { .. } => "CompileFailed",
            Self::LinkFailed { .. } => "LinkFailed",
            Self::LoadFailed { .. } => "LoadFailed",
            Self::InitFailed { .. } => "InitFailed",
            Self::Timeout { .. } => "Timeout",
            Self::Cancelled { .. } => "Cancelled",
            Self::Io { .. } => "Io",
            Self::Config(_) => "Config",
        }
    }

    /// Wrap an IO error with the path it happened at.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Incompatible configuration: {0}")]
    Incompatible(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
