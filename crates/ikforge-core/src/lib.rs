//! Shared vocabulary for the ikforge workspace.
//!
//! Defines the closed set of IK [`ProblemType`]s with their DOF table, the
//! [`IkTarget`] a solver is asked to reach, the [`ForgeError`] taxonomy used
//! across every pipeline stage, and the TOML-backed configuration structs.

pub mod config;
pub mod error;
pub mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use config::{
    AutogeneratePreset, ForgeConfig, GenerateOptions, GeneratorConfig, TimeoutConfig,
    ToolchainConfig,
};
pub use error::{ConfigError, ForgeError, Stage};
pub use types::{IkTarget, JointId, ProblemType};

/// Convenience imports for downstream crates.
pub mod prelude {
    pub use crate::config::{ForgeConfig, GenerateOptions};
    pub use crate::error::{ForgeError, Stage};
    pub use crate::types::{IkTarget, JointId, ProblemType};
}
