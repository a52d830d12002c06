//! `IkModel`: one manipulator + problem type, from partition to attached solver.
//!
//! # Usage
//!
//! 1. Create an [`IkModel`] for a manipulator's chain and a [`ProblemType`].
//! 2. Call [`IkModel::generate`] (or [`IkModel::autogenerate`]) with a
//!    [`BuildPipeline`] to make sure the solver library exists on disk.
//! 3. Call [`IkModel::load`] to register and attach it in an [`Environment`].
//! 4. Optionally [`IkModel::evaluate`] its success rate.

use ikforge_build::{
    BuildArtifact, BuildPipeline, BuildRequest, CacheKey, FreeJointPolicy, JointPartition,
    derive_key, partition_with_policy,
};
use ikforge_core::{AutogeneratePreset, ForgeError, GenerateOptions, JointId, ProblemType};
use ikforge_urdf::KinematicChain;
use tracing::info;

use crate::evaluate::{SuccessRateEvaluator, SuccessReport};
use crate::loader;
use crate::registry::Environment;
use crate::solver::SolverHandle;

/// Build and load state of one analytic solver.
pub struct IkModel {
    manipulator: String,
    chain: KinematicChain,
    problem_type: ProblemType,
    free_joints: Option<Vec<JointId>>,
    policy: FreeJointPolicy,
    options: GenerateOptions,
    handle: Option<SolverHandle>,
}

impl IkModel {
    pub fn new(
        manipulator: impl Into<String>,
        chain: KinematicChain,
        problem_type: ProblemType,
    ) -> Self {
        Self {
            manipulator: manipulator.into(),
            chain,
            problem_type,
            free_joints: None,
            policy: FreeJointPolicy::default(),
            options: GenerateOptions::default(),
            handle: None,
        }
    }

    /// Hold these joints as free parameters instead of letting the policy pick.
    #[must_use]
    pub fn with_free_joints(mut self, free_joints: Vec<JointId>) -> Self {
        self.free_joints = Some(free_joints);
        self
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: FreeJointPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerateOptions) -> Self {
        self.options = options;
        self
    }

    pub fn manipulator(&self) -> &str {
        &self.manipulator
    }

    pub const fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub const fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    pub const fn handle(&self) -> Option<&SolverHandle> {
        self.handle.as_ref()
    }

    pub fn partition(&self) -> Result<JointPartition, ForgeError> {
        partition_with_policy(
            &self.chain.joint_ids(),
            self.problem_type.expected_dof(),
            self.free_joints.as_deref(),
            self.policy,
        )
    }

    pub fn key(&self) -> Result<CacheKey, ForgeError> {
        Ok(derive_key(
            &self.chain,
            &self.manipulator,
            self.problem_type,
            &self.partition()?,
        ))
    }

    /// Build the solver library unless it is already cached.
    pub fn generate(
        &self,
        pipeline: &BuildPipeline<'_>,
        force: bool,
    ) -> Result<BuildArtifact, ForgeError> {
        let partition = self.partition()?;
        pipeline.build(&BuildRequest {
            chain: &self.chain,
            manipulator: &self.manipulator,
            problem_type: self.problem_type,
            partition: &partition,
            options: &self.options,
            force,
        })
    }

    /// Generate with a known-good free joint preset for this robot.
    ///
    /// Without a matching preset, falls back to plain generation when
    /// `force_generate` is set and fails otherwise. `force` is passed on to
    /// [`generate`](Self::generate) either way.
    pub fn autogenerate(
        &mut self,
        pipeline: &BuildPipeline<'_>,
        presets: &[AutogeneratePreset],
        force_generate: bool,
        force: bool,
    ) -> Result<BuildArtifact, ForgeError> {
        let preset = presets
            .iter()
            .find(|p| p.matches(self.chain.fingerprint(), &self.manipulator, self.problem_type));
        match preset {
            Some(preset) => {
                info!(
                    manipulator = %self.manipulator,
                    free_joints = ?preset.free_joints,
                    "using autogenerate preset"
                );
                self.free_joints = Some(preset.free_joints.clone());
                self.generate(pipeline, force)
            }
            None if force_generate => self.generate(pipeline, force),
            None => Err(ForgeError::InvalidConfiguration(format!(
                "no autogenerate preset for robot {} manipulator {} ({})",
                self.chain.fingerprint(),
                self.manipulator,
                self.problem_type
            ))),
        }
    }

    /// Register the cached library and attach its solver to the manipulator.
    ///
    /// Does not build: a missing library fails with `LoadFailed`.
    pub fn load(
        &mut self,
        env: &mut Environment,
        pipeline: &BuildPipeline<'_>,
    ) -> Result<&SolverHandle, ForgeError> {
        let key = self.key()?;
        let artifact = pipeline.artifact_for(&key);
        let handle = loader::load(env, &self.manipulator, &key, &artifact.library_path)?;
        Ok(self.handle.insert(handle))
    }

    /// Whether a loaded solver is attached and still active on the manipulator.
    pub fn has(&self, env: &Environment) -> bool {
        loader::has(env, &self.manipulator, self.handle.as_ref())
    }

    /// Nothing to persist: the compiled library on disk is the saved state.
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    pub fn save(&self) -> Result<(), ForgeError> {
        Ok(())
    }

    /// Success rate of the loaded solver over `samples` random configurations.
    pub fn evaluate(
        &self,
        evaluator: &dyn SuccessRateEvaluator,
        samples: usize,
    ) -> Result<SuccessReport, ForgeError> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            ForgeError::InvalidConfiguration(format!(
                "no ik solver loaded for manipulator {}",
                self.manipulator
            ))
        })?;
        Ok(evaluator.evaluate(&self.chain, handle, samples))
    }
}
