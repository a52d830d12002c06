//! Generate, compile and link one solver, skipping whatever is already on disk.
//!
//! ```text
//! validate ──► CheckSource ──(missing | force)──► generate ──► write source
//!                   │                                              │
//!                   └──(cached)──┐                ┌────────────────┘
//!                                ▼                ▼
//!                         CheckLibrary ──(missing | force | regenerated)──► compile ──► link ──► publish
//! ```
//!
//! Each stage runs at most once per call and nothing is retried.

use std::path::{Path, PathBuf};

use ikforge_core::{ForgeError, GenerateOptions, ProblemType};
use ikforge_urdf::KinematicChain;
use tracing::{debug, info};

use crate::cache_key::{BuildArtifact, CacheKey, artifact_paths, derive_key};
use crate::generator::{GenerationRequest, Generator};
use crate::partition::JointPartition;
use crate::publish::{atomic_write, ensure_parent_dirs, publish, temp_path_for};
use crate::toolchain::Toolchain;
use crate::validate::validate_dof;

/// Inputs of one [`BuildPipeline::build`] call.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub chain: &'a KinematicChain,
    pub manipulator: &'a str,
    pub problem_type: ProblemType,
    pub partition: &'a JointPartition,
    pub options: &'a GenerateOptions,
    /// Regenerate and rebuild even if artifacts exist.
    pub force: bool,
}

impl BuildRequest<'_> {
    pub fn key(&self) -> CacheKey {
        derive_key(self.chain, self.manipulator, self.problem_type, self.partition)
    }
}

/// Drives a [`Generator`] and a [`Toolchain`] over the on-disk artifact cache.
pub struct BuildPipeline<'a> {
    generator: &'a dyn Generator,
    toolchain: &'a dyn Toolchain,
    output_dir: PathBuf,
    build_macro: String,
}

impl<'a> BuildPipeline<'a> {
    pub fn new(
        generator: &'a dyn Generator,
        toolchain: &'a dyn Toolchain,
        output_dir: impl Into<PathBuf>,
        build_macro: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            toolchain,
            output_dir: output_dir.into(),
            build_macro: build_macro.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Paths a request would build to, without building.
    pub fn artifact_for(&self, key: &CacheKey) -> BuildArtifact {
        artifact_paths(key, &self.output_dir, self.toolchain)
    }

    /// Make sure the source and library for `request` exist.
    ///
    /// DOF and option validation happen before any file is touched or any
    /// external tool is started.
    pub fn build(&self, request: &BuildRequest<'_>) -> Result<BuildArtifact, ForgeError> {
        validate_dof(request.partition, request.problem_type.expected_dof())?;
        request.options.validate()?;

        let key = request.key();
        let artifact = self.artifact_for(&key);

        let regenerated = if request.force || !artifact.source_path.exists() {
            self.generate_source(request, &artifact.source_path)?;
            true
        } else {
            debug!(key = %key, path = %artifact.source_path.display(), "source cached, skipping generation");
            false
        };

        if request.force || regenerated || !artifact.library_path.exists() {
            self.compile_and_link(&artifact)?;
        } else {
            debug!(key = %key, path = %artifact.library_path.display(), "library cached, skipping compile");
        }

        info!(key = %key, library = %artifact.library_path.display(), "ik solver artifact ready");
        Ok(artifact)
    }

    fn generate_source(&self, request: &BuildRequest<'_>, path: &Path) -> Result<(), ForgeError> {
        let generation = GenerationRequest {
            chain: request.chain,
            manipulator: request.manipulator,
            problem_type: request.problem_type,
            partition: request.partition,
            options: request.options,
        };
        let source = self.generator.generate(&generation)?;
        if source.trim().is_empty() {
            return Err(ForgeError::GenerationFailed {
                target: generation.target(),
                message: "generator returned empty source".into(),
            });
        }
        atomic_write(path, source.as_bytes())?;
        info!(path = %path.display(), "wrote generated source");
        Ok(())
    }

    fn compile_and_link(&self, artifact: &BuildArtifact) -> Result<(), ForgeError> {
        ensure_parent_dirs(&artifact.library_path)?;
        let model_dir = artifact.model_dir();
        // Objects live only for this build; dropping the dir removes them on every path.
        let obj_dir = tempfile::Builder::new()
            .prefix(".obj-")
            .tempdir_in(model_dir)
            .map_err(|e| ForgeError::io(model_dir, e))?;
        let macros = [(self.build_macro.clone(), "1".to_owned())];
        let objects = self.toolchain.compile(
            std::slice::from_ref(&artifact.source_path),
            &macros,
            obj_dir.path(),
        )?;
        debug!(objects = objects.len(), dir = %obj_dir.path().display(), "compiled");

        let tmp = temp_path_for(&artifact.library_path);
        if let Err(e) = self.toolchain.link_shared_object(&objects, &tmp) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        publish(&tmp, &artifact.library_path)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
