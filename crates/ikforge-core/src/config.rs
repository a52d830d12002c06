use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{JointId, ProblemType};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_accuracy() -> f64 {
    1e-7
}
const fn default_precision() -> u32 {
    10
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("ikforge-cache")
}
const fn default_min_success_rate() -> f64 {
    0.95
}
fn default_build_macro() -> String {
    "IKFAST_CLIBRARY".into()
}
fn default_generator_program() -> String {
    "ikfast".into()
}
const fn default_generate_secs() -> u64 {
    600
}
const fn default_compile_secs() -> u64 {
    600
}
const fn default_link_secs() -> u64 {
    120
}

fn default_compiler() -> String {
    if cfg!(windows) { "cl".into() } else { "c++".into() }
}

fn default_compile_flags() -> Vec<String> {
    if cfg!(windows) {
        vec!["/O2".into(), "/EHsc".into()]
    } else {
        vec!["-O3".into(), "-fPIC".into()]
    }
}

fn default_libraries() -> Vec<String> {
    if cfg!(windows) {
        Vec::new()
    } else {
        vec!["stdc++".into()]
    }
}

// ---------------------------------------------------------------------------
// GenerateOptions
// ---------------------------------------------------------------------------

/// Options forwarded to the symbolic generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Magnitude below which generated expressions treat a value as zero
    /// (default: 1e-7).
    #[serde(default = "default_accuracy")]
    pub accuracy: f64,

    /// Decimal digits used by the generator (default: 10).
    #[serde(default = "default_precision")]
    pub precision: u32,

    /// Fix joints outside the solve set at zero instead of exposing them as
    /// free parameters.
    #[serde(default)]
    pub use_dummy_joints: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            accuracy: default_accuracy(),
            precision: default_precision(),
            use_dummy_joints: false,
        }
    }
}

impl GenerateOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.accuracy.is_finite() || self.accuracy <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "accuracy".into(),
                message: format!("{} (must be finite and > 0)", self.accuracy),
            });
        }
        if !(1..=30).contains(&self.precision) {
            return Err(ConfigError::InvalidValue {
                field: "precision".into(),
                message: format!("{} (must be in 1..=30)", self.precision),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ToolchainConfig
// ---------------------------------------------------------------------------

/// Native compiler / linker invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Compiler executable (default: `c++`, or `cl` on Windows).
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Linker executable. `None` links with the compiler driver.
    #[serde(default)]
    pub linker: Option<String>,

    /// Optimization and code-generation flags passed at compile time.
    #[serde(default = "default_compile_flags")]
    pub compile_flags: Vec<String>,

    /// Extra flags passed at link time.
    #[serde(default)]
    pub link_flags: Vec<String>,

    /// Libraries linked into the shared object (default: `stdc++` on unix).
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,

    /// Macro defined to `1` so the generated source exposes its C entry points.
    #[serde(default = "default_build_macro")]
    pub build_macro: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            linker: None,
            compile_flags: default_compile_flags(),
            link_flags: Vec::new(),
            libraries: default_libraries(),
            build_macro: default_build_macro(),
        }
    }
}

impl ToolchainConfig {
    /// Whether the compiler uses MSVC-style command lines.
    pub fn is_msvc(&self) -> bool {
        // Split on both separators so Windows paths are recognized anywhere.
        let file = self
            .compiler
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default();
        let stem = file
            .strip_suffix(".exe")
            .or_else(|| file.strip_suffix(".EXE"))
            .unwrap_or(file);
        stem.eq_ignore_ascii_case("cl")
    }

    /// Executable used for the link step.
    pub fn linker_program(&self) -> &str {
        self.linker.as_deref().unwrap_or(&self.compiler)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compiler.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "toolchain.compiler".into(),
                message: "must not be empty".into(),
            });
        }
        if self.build_macro.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "toolchain.build_macro".into(),
                message: "must not be empty".into(),
            });
        }
        if self.linker.as_deref().is_some_and(|l| l.trim().is_empty()) {
            return Err(ConfigError::Incompatible(
                "toolchain.linker is set but empty".into(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

/// External command that performs the symbolic derivation.
///
/// The command receives the robot file and the joint partition as arguments
/// and prints the generated source on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Executable (default: `ikfast`).
    #[serde(default = "default_generator_program")]
    pub program: String,

    /// Arguments placed before the generated request arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            program: default_generator_program(),
            args: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// TimeoutConfig
// ---------------------------------------------------------------------------

/// Wall-clock budgets for external stages, in seconds. Zero disables the limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_generate_secs")]
    pub generate_secs: u64,
    #[serde(default = "default_compile_secs")]
    pub compile_secs: u64,
    #[serde(default = "default_link_secs")]
    pub link_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            generate_secs: default_generate_secs(),
            compile_secs: default_compile_secs(),
            link_secs: default_link_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// AutogeneratePreset
// ---------------------------------------------------------------------------

/// Known-good free joint selection for a specific robot structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutogeneratePreset {
    /// Structural fingerprint of the robot the preset applies to.
    pub fingerprint: String,
    /// Manipulator name.
    pub manipulator: String,
    /// Problem type (default: `6d`).
    #[serde(default)]
    pub problem_type: ProblemType,
    /// Joints to hold as free parameters.
    pub free_joints: Vec<JointId>,
}

impl AutogeneratePreset {
    pub fn matches(&self, fingerprint: &str, manipulator: &str, problem_type: ProblemType) -> bool {
        self.fingerprint == fingerprint
            && self.manipulator == manipulator
            && self.problem_type == problem_type
    }
}

// ---------------------------------------------------------------------------
// ForgeConfig
// ---------------------------------------------------------------------------

/// Top-level configuration, usually loaded from `ikforge.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForgeConfig {
    /// Root of the artifact cache; each robot gets a subdirectory named
    /// after its structural fingerprint.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default)]
    pub generate: GenerateOptions,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Success rate a solver must reach in randomized testing (default: 0.95).
    #[serde(default = "default_min_success_rate")]
    pub min_success_rate: f64,

    /// Seed for randomized configuration sampling.
    #[serde(default)]
    pub sample_seed: u64,

    #[serde(default)]
    pub presets: Vec<AutogeneratePreset>,
}

impl Default for ForgeConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            generate: GenerateOptions::default(),
            toolchain: ToolchainConfig::default(),
            generator: GeneratorConfig::default(),
            timeouts: TimeoutConfig::default(),
            min_success_rate: default_min_success_rate(),
            sample_seed: 0,
            presets: Vec::new(),
        }
    }
}

impl ForgeConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.generate.validate()?;
        self.toolchain.validate()?;
        if !(0.0..=1.0).contains(&self.min_success_rate) {
            return Err(ConfigError::InvalidValue {
                field: "min_success_rate".into(),
                message: format!("{} (must be in [0, 1])", self.min_success_rate),
            });
        }
        if self.generator.program.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "generator.program".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Find the autogenerate preset for a robot / manipulator / problem type.
    pub fn preset_for(
        &self,
        fingerprint: &str,
        manipulator: &str,
        problem_type: ProblemType,
    ) -> Option<&AutogeneratePreset> {
        self.presets
            .iter()
            .find(|p| p.matches(fingerprint, manipulator, problem_type))
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
