//! Recording stand-ins for the generator, toolchain and library loader.
//!
//! The stubs cooperate through the files they write: [`RecordingGenerator`]
//! emits a one-line source header describing the partition,
//! [`RecordingToolchain`] copies it through "compile" and "link", and
//! [`InMemoryLoader`] reads it back to hand out [`ReferenceLibrary`] solvers.
//! A full generate → build → load round trip therefore works without a
//! native toolchain.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ikforge_build::{GenerationRequest, Generator, Toolchain};
use ikforge_core::{ForgeError, JointId, ProblemType};
use ikforge_env::{IkLibrary, IkSolver, LibraryError, LibraryLoader, ReferenceLibrary};

const HEADER: &str = "// ikforge-test-solver";

/// Source text describing `request`, as written by [`RecordingGenerator`].
pub fn fake_source(request: &GenerationRequest<'_>) -> String {
    let list = |ids: &[JointId]| {
        ids.iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{HEADER} problem={} solve={} free={}\n",
        request.problem_type,
        list(request.partition.solve_joints()),
        list(request.partition.free_joints()),
    )
}

fn parse_source(text: &str) -> Option<ReferenceLibrary> {
    let line = text.lines().find(|l| l.starts_with(HEADER))?;
    let mut problem = None;
    let mut solve = None;
    let mut free = None;
    let ids = |v: &str| -> Option<Vec<JointId>> {
        v.split(',')
            .filter(|s| !s.is_empty())
            .map(|s| s.parse().ok())
            .collect()
    };
    for field in line[HEADER.len()..].split_whitespace() {
        let (k, v) = field.split_once('=')?;
        match k {
            "problem" => problem = v.parse::<ProblemType>().ok(),
            "solve" => solve = ids(v),
            "free" => free = ids(v),
            _ => {}
        }
    }
    Some(ReferenceLibrary::new(problem?, solve?, free?))
}

fn count(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

// ---------------------------------------------------------------------------
// RecordingGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum GeneratorScript {
    Succeed,
    Empty,
    Fail(String),
}

/// A generator that counts calls and returns [`fake_source`] text.
#[derive(Debug)]
pub struct RecordingGenerator {
    calls: AtomicUsize,
    script: GeneratorScript,
}

impl Default for RecordingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGenerator {
    pub const fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: GeneratorScript::Succeed,
        }
    }

    /// A generator that "succeeds" with empty output.
    pub const fn empty() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: GeneratorScript::Empty,
        }
    }

    /// A generator that fails with `GenerationFailed`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            script: GeneratorScript::Fail(message.into()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for RecordingGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ForgeError> {
        count(&self.calls);
        match &self.script {
            GeneratorScript::Succeed => Ok(fake_source(request)),
            GeneratorScript::Empty => Ok(String::new()),
            GeneratorScript::Fail(message) => Err(ForgeError::GenerationFailed {
                target: request.target(),
                message: message.clone(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingToolchain
// ---------------------------------------------------------------------------

/// A toolchain that copies files instead of compiling, and counts calls.
#[derive(Debug, Default)]
pub struct RecordingToolchain {
    compiles: AtomicUsize,
    links: AtomicUsize,
    compile_error: Option<String>,
    link_error: Option<String>,
    macros: Mutex<Vec<(String, String)>>,
}

impl RecordingToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every compile with these diagnostics.
    #[must_use]
    pub fn failing_compile(mut self, diagnostics: impl Into<String>) -> Self {
        self.compile_error = Some(diagnostics.into());
        self
    }

    /// Fail every link with these diagnostics.
    #[must_use]
    pub fn failing_link(mut self, diagnostics: impl Into<String>) -> Self {
        self.link_error = Some(diagnostics.into());
        self
    }

    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }

    pub fn links(&self) -> usize {
        self.links.load(Ordering::SeqCst)
    }

    /// Macros passed to the most recent compile.
    pub fn last_macros(&self) -> Vec<(String, String)> {
        self.macros.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl Toolchain for RecordingToolchain {
    fn compile(
        &self,
        sources: &[PathBuf],
        macros: &[(String, String)],
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ForgeError> {
        count(&self.compiles);
        if let Ok(mut m) = self.macros.lock() {
            *m = macros.to_vec();
        }
        if let Some(diagnostics) = &self.compile_error {
            return Err(ForgeError::CompileFailed {
                path: sources.first().cloned().unwrap_or_default(),
                diagnostics: diagnostics.clone(),
            });
        }
        std::fs::create_dir_all(output_dir).map_err(|e| ForgeError::io(output_dir, e))?;
        sources
            .iter()
            .map(|source| {
                let stem = source.file_stem().unwrap_or_default().to_string_lossy();
                let object = output_dir.join(format!("{stem}.o"));
                std::fs::copy(source, &object).map_err(|e| ForgeError::io(source, e))?;
                Ok(object)
            })
            .collect()
    }

    fn link_shared_object(&self, objects: &[PathBuf], output: &Path) -> Result<(), ForgeError> {
        count(&self.links);
        if let Some(diagnostics) = &self.link_error {
            return Err(ForgeError::LinkFailed {
                path: output.to_path_buf(),
                diagnostics: diagnostics.clone(),
            });
        }
        let mut library = Vec::new();
        for object in objects {
            library.extend(std::fs::read(object).map_err(|e| ForgeError::io(object, e))?);
        }
        std::fs::write(output, library).map_err(|e| ForgeError::io(output, e))
    }
}

// ---------------------------------------------------------------------------
// InMemoryLoader
// ---------------------------------------------------------------------------

/// Library that never produces a solver.
pub struct NullLibrary;

impl IkLibrary for NullLibrary {
    fn create_solver(&self) -> Option<Arc<dyn IkSolver>> {
        None
    }
}

/// Loader reading libraries written by [`RecordingToolchain`].
///
/// Clones share the open counter, so a test can keep one clone while the
/// environment owns another.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    opens: Arc<AtomicUsize>,
    null_solvers: bool,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open successfully but never create a solver.
    #[must_use]
    pub const fn with_null_solvers(mut self) -> Self {
        self.null_solvers = true;
        self
    }

    /// Number of `open` calls so far (successful or not).
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

impl LibraryLoader for InMemoryLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn IkLibrary>, LibraryError> {
        count(&self.opens);
        let text = std::fs::read_to_string(path).map_err(|e| LibraryError::Open {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if self.null_solvers {
            return Ok(Arc::new(NullLibrary));
        }
        let library = parse_source(&text).ok_or_else(|| LibraryError::Open {
            path: path.to_path_buf(),
            message: "not an ikforge test library".into(),
        })?;
        Ok(Arc::new(library))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ikforge_build::partition;
    use ikforge_core::GenerateOptions;

    use crate::fixtures::six_dof_chain;

    #[test]
    fn fake_source_round_trips_through_loader() {
        let chain = six_dof_chain();
        let p = partition(&chain.joint_ids(), 3, None).unwrap();
        let options = GenerateOptions::default();
        let request = GenerationRequest {
            chain: &chain,
            manipulator: "arm",
            problem_type: ProblemType::Translation3D,
            partition: &p,
            options: &options,
        };
        let text = fake_source(&request);
        assert!(text.contains("problem=t3d solve=3,4,5 free=0,1,2"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libfake.so");
        std::fs::write(&path, &text).unwrap();
        let loader = InMemoryLoader::new();
        let library = loader.open(&path).ok().unwrap();
        let solver = library.create_solver().unwrap();
        assert_eq!(solver.num_joints(), 3);
        assert_eq!(solver.num_free_parameters(), 3);
        assert!(solver.init(&chain));
        assert_eq!(loader.clone().opens(), 1);
    }

    #[test]
    fn loader_rejects_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = InMemoryLoader::new();
        assert!(loader.open(&dir.path().join("nope.so")).is_err());
        let foreign = dir.path().join("foreign.so");
        std::fs::write(&foreign, "\x7fELF").unwrap();
        assert!(loader.open(&foreign).is_err());
        assert_eq!(loader.opens(), 2);
    }

    #[test]
    fn toolchain_records_and_fails_on_request() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("s.cpp");
        std::fs::write(&src, "x").unwrap();
        let tc = RecordingToolchain::new().failing_link("ld: boom");
        let macros = [("IKFAST_CLIBRARY".to_owned(), "1".to_owned())];
        let objects = tc.compile(&[src], &macros, &dir.path().join("obj")).unwrap();
        assert_eq!(tc.last_macros(), macros.to_vec());
        let err = tc
            .link_shared_object(&objects, &dir.path().join("libs.so"))
            .unwrap_err();
        assert!(matches!(err, ForgeError::LinkFailed { ref diagnostics, .. } if diagnostics == "ld: boom"));
        assert_eq!((tc.compiles(), tc.links()), (1, 1));
    }
}
