//! Native compile and link of generated solver source.

use std::path::{Path, PathBuf};
use std::process::Command;

use ikforge_core::{ForgeError, Stage, TimeoutConfig, ToolchainConfig};
use tracing::{debug, info};

use crate::process::{CancelToken, budget, run_bounded};

/// Compiles sources to objects and links objects into a shared library.
///
/// Diagnostics from a failing tool are returned unmodified in
/// [`ForgeError::CompileFailed`] / [`ForgeError::LinkFailed`].
pub trait Toolchain {
    /// Platform file name of a shared library with the given stem
    /// (`lib<stem>.so`, `lib<stem>.dylib` or `<stem>.dll`).
    fn shared_library_filename(&self, stem: &str) -> String {
        format!(
            "{}{stem}{}",
            std::env::consts::DLL_PREFIX,
            std::env::consts::DLL_SUFFIX
        )
    }

    /// Extension given to generated source files.
    fn source_extension(&self) -> &str {
        "cpp"
    }

    /// Compile each source with `macros` defined. Objects go to `output_dir`.
    fn compile(
        &self,
        sources: &[PathBuf],
        macros: &[(String, String)],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ForgeError>;

    /// Link `objects` into the shared library `output`.
    fn link_shared_object(&self, objects: &[PathBuf], output: &Path) -> Result<(), ForgeError>;
}

// ---------------------------------------------------------------------------
// CcToolchain
// ---------------------------------------------------------------------------

/// Command-line C++ toolchain: gcc/clang style, or MSVC when the compiler is `cl`.
#[derive(Debug, Clone)]
pub struct CcToolchain {
    config: ToolchainConfig,
    timeouts: TimeoutConfig,
    cancel: CancelToken,
}

impl CcToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        Self {
            config,
            timeouts: TimeoutConfig::default(),
            cancel: CancelToken::default(),
        }
    }

    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub const fn config(&self) -> &ToolchainConfig {
        &self.config
    }

    fn object_path(&self, source: &Path, output_dir: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .unwrap_or(source.as_os_str())
            .to_string_lossy();
        let ext = if self.config.is_msvc() { "obj" } else { "o" };
        output_dir.join(format!("{stem}.{ext}"))
    }

    /// Compiler arguments for one source file.
    pub fn compile_args(
        &self,
        source: &Path,
        object: &Path,
        macros: &[(String, String)],
    ) -> Vec<String> {
        let mut args = Vec::new();
        if self.config.is_msvc() {
            args.push("/nologo".into());
            args.push("/c".into());
            args.push(source.display().to_string());
            args.push(format!("/Fo{}", object.display()));
            args.extend(macros.iter().map(|(k, v)| format!("/D{k}={v}")));
        } else {
            args.push("-c".into());
            args.push(source.display().to_string());
            args.push("-o".into());
            args.push(object.display().to_string());
            args.extend(macros.iter().map(|(k, v)| format!("-D{k}={v}")));
        }
        args.extend(self.config.compile_flags.iter().cloned());
        args
    }

    /// Linker arguments producing `output` from `objects`.
    pub fn link_args(&self, objects: &[PathBuf], output: &Path) -> Vec<String> {
        let mut args = Vec::new();
        let objects = objects.iter().map(|o| o.display().to_string());
        if self.config.is_msvc() {
            args.push("/nologo".into());
            args.push("/LD".into());
            args.extend(objects);
            args.extend(self.config.libraries.iter().map(|l| format!("{l}.lib")));
            args.push("/link".into());
            args.push(format!("/OUT:{}", output.display()));
        } else {
            args.push("-shared".into());
            args.push("-o".into());
            args.push(output.display().to_string());
            args.extend(objects);
            args.extend(self.config.libraries.iter().map(|l| format!("-l{l}")));
        }
        args.extend(self.config.link_flags.iter().cloned());
        args
    }
}

impl Toolchain for CcToolchain {
    fn compile(
        &self,
        sources: &[PathBuf],
        macros: &[(String, String)],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ForgeError> {
        std::fs::create_dir_all(output_dir).map_err(|e| ForgeError::io(output_dir, e))?;

        let mut objects = Vec::with_capacity(sources.len());
        for source in sources {
            self.cancel.check(Stage::Compile)?;
            let object = self.object_path(source, output_dir);
            info!(source = %source.display(), compiler = %self.config.compiler, "compiling ik solver");

            let mut cmd = Command::new(&self.config.compiler);
            cmd.args(self.compile_args(source, &object, macros));
            let failed = |diagnostics: String| ForgeError::CompileFailed {
                path: source.clone(),
                diagnostics,
            };
            let output = run_bounded(&mut cmd, budget(self.timeouts.compile_secs), &self.cancel)
                .map_err(|e| e.into_forge(Stage::Compile, &failed))?;
            if !output.status.success() {
                return Err(failed(diagnostics(&output.stdout_lossy(), &output.stderr_lossy())));
            }
            debug!(object = %object.display(), "compiled");
            objects.push(object);
        }
        Ok(objects)
    }

    fn link_shared_object(&self, objects: &[PathBuf], output: &Path) -> Result<(), ForgeError> {
        self.cancel.check(Stage::Link)?;
        let linker = self.config.linker_program();
        info!(output = %output.display(), %linker, "linking ik solver");

        let mut cmd = Command::new(linker);
        cmd.args(self.link_args(objects, output));
        let failed = |diagnostics: String| ForgeError::LinkFailed {
            path: output.to_path_buf(),
            diagnostics,
        };
        let result = run_bounded(&mut cmd, budget(self.timeouts.link_secs), &self.cancel)
            .map_err(|e| e.into_forge(Stage::Link, &failed))?;
        if !result.status.success() {
            return Err(failed(diagnostics(&result.stdout_lossy(), &result.stderr_lossy())));
        }
        Ok(())
    }
}

/// MSVC reports errors on stdout; gcc/clang on stderr. Keep both verbatim.
fn diagnostics(stdout: &str, stderr: &str) -> String {
    match (stdout.is_empty(), stderr.is_empty()) {
        (true, _) => stderr.to_owned(),
        (false, true) => stdout.to_owned(),
        (false, false) => format!("{stdout}{stderr}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
