//! Symbolic solver generation.
//!
//! A [`Generator`] turns a chain, a problem type and a joint partition into
//! the source text of an analytic solver. The production implementation,
//! [`CommandGenerator`], delegates to an external program and reads the
//! source from its stdout.

use std::path::PathBuf;
use std::process::Command;

use ikforge_core::{ForgeError, GenerateOptions, GeneratorConfig, ProblemType, Stage};
use ikforge_urdf::KinematicChain;
use tracing::{debug, info};

use crate::partition::JointPartition;
use crate::process::{CancelToken, budget, run_bounded};

/// Everything a generator needs to derive one solver.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub chain: &'a KinematicChain,
    pub manipulator: &'a str,
    pub problem_type: ProblemType,
    pub partition: &'a JointPartition,
    pub options: &'a GenerateOptions,
}

impl GenerationRequest<'_> {
    /// Human-readable target used in error messages.
    pub fn target(&self) -> String {
        format!("{}.{}", self.manipulator, self.problem_type)
    }
}

/// Produces solver source text.
///
/// Must be deterministic for a given request; the build cache relies on it.
pub trait Generator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ForgeError>;
}

// ---------------------------------------------------------------------------
// CommandGenerator
// ---------------------------------------------------------------------------

/// Runs an external generator program.
///
/// Invoked as
///
/// ```text
/// <program> <args..> --robot=<file> --baselink=<i> --eelink=<i>
///     --solvejoints=<a,b,..> [--freejoints=<c,..>] --solvefn=<fn>
///     --accuracy=<f> --precision=<n> [--usedummyjoints]
/// ```
///
/// A non-zero exit or empty stdout is a generation failure.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    config: GeneratorConfig,
    robot_file: PathBuf,
    timeout_secs: u64,
    cancel: CancelToken,
}

impl CommandGenerator {
    pub fn new(config: GeneratorConfig, robot_file: impl Into<PathBuf>) -> Self {
        Self {
            config,
            robot_file: robot_file.into(),
            timeout_secs: 0,
            cancel: CancelToken::default(),
        }
    }

    /// Wall-clock budget in seconds, zero for none.
    #[must_use]
    pub const fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Full argument list for `request`, after the configured prefix args.
    pub fn request_args(&self, request: &GenerationRequest<'_>) -> Vec<String> {
        let list = |ids: &[usize]| {
            ids.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        let mut args = self.config.args.clone();
        args.push(format!("--robot={}", self.robot_file.display()));
        args.push(format!("--baselink={}", request.chain.base_link()));
        args.push(format!("--eelink={}", request.chain.ee_link()));
        args.push(format!(
            "--solvejoints={}",
            list(request.partition.solve_joints())
        ));
        if !request.partition.free_joints().is_empty() {
            args.push(format!(
                "--freejoints={}",
                list(request.partition.free_joints())
            ));
        }
        args.push(format!("--solvefn={}", request.problem_type.solve_fn()));
        args.push(format!("--accuracy={}", request.options.accuracy));
        args.push(format!("--precision={}", request.options.precision));
        if request.options.use_dummy_joints {
            args.push("--usedummyjoints".into());
        }
        args
    }
}

impl Generator for CommandGenerator {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, ForgeError> {
        let target = request.target();
        let failed = |message: String| ForgeError::GenerationFailed {
            target: target.clone(),
            message,
        };

        info!(
            target = %target,
            program = %self.config.program,
            solve_joints = ?request.partition.solve_joints(),
            free_joints = ?request.partition.free_joints(),
            "generating ik solver (this may take a while)"
        );

        let mut cmd = Command::new(&self.config.program);
        cmd.args(self.request_args(request));
        let output = run_bounded(&mut cmd, budget(self.timeout_secs), &self.cancel)
            .map_err(|e| e.into_forge(Stage::Generate, &failed))?;

        if !output.status.success() {
            return Err(failed(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                output.stderr_lossy().trim()
            )));
        }
        let source = String::from_utf8(output.stdout).map_err(|e| {
            failed(format!(
                "generator output is not valid UTF-8 (first bad byte at offset {})",
                e.utf8_error().valid_up_to()
            ))
        })?;
        if source.trim().is_empty() {
            return Err(failed("generator produced no source".into()));
        }
        debug!(bytes = source.len(), "generator finished");
        Ok(source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::partition;
    use ikforge_urdf::parse_string;

    const THREE_JOINT_URDF: &str = r#"
        <robot name="tri">
            <link name="base"/>
            <link name="l1"/>
            <link name="l2"/>
            <link name="l3"/>
            <joint name="j1" type="revolute">
                <parent link="base"/><child link="l1"/>
                <axis xyz="0 0 1"/>
                <limit lower="-2.5" upper="2.5" effort="1" velocity="1"/>
            </joint>
            <joint name="j2" type="revolute">
                <parent link="l1"/><child link="l2"/>
                <origin xyz="0 0 0.3"/>
                <axis xyz="0 1 0"/>
                <limit lower="-2.5" upper="2.5" effort="1" velocity="1"/>
            </joint>
            <joint name="j3" type="revolute">
                <parent link="l2"/><child link="l3"/>
                <origin xyz="0 0 0.3"/>
                <axis xyz="0 1 0"/>
                <limit lower="-2.5" upper="2.5" effort="1" velocity="1"/>
            </joint>
        </robot>
    "#;

    fn chain() -> KinematicChain {
        let model = parse_string(THREE_JOINT_URDF).unwrap();
        KinematicChain::from_model(&model, "base", "l3").unwrap()
    }

    #[test]
    fn request_args_describe_partition() {
        let chain = chain();
        let p = partition(&chain.joint_ids(), 2, None).unwrap();
        let opts = GenerateOptions {
            use_dummy_joints: true,
            ..GenerateOptions::default()
        };
        let request = GenerationRequest {
            chain: &chain,
            manipulator: "arm",
            problem_type: ProblemType::Direction3D,
            partition: &p,
            options: &opts,
        };
        let config = GeneratorConfig {
            program: "ikfast".into(),
            args: vec!["--prefix".into()],
        };
        let args = CommandGenerator::new(config, "/robots/tri.urdf").request_args(&request);
        assert_eq!(
            args,
            vec![
                "--prefix",
                "--robot=/robots/tri.urdf",
                "--baselink=0",
                "--eelink=3",
                "--solvejoints=1,2",
                "--freejoints=0",
                "--solvefn=solveFullIK_Direction3D",
                "--accuracy=0.0000001",
                "--precision=10",
                "--usedummyjoints",
            ]
        );
        assert_eq!(request.target(), "arm.d2d");
    }

    #[cfg(unix)]
    #[test]
    fn empty_stdout_is_generation_failure() {
        let chain = chain();
        let p = partition(&chain.joint_ids(), 3, None).unwrap();
        let opts = GenerateOptions::default();
        let request = GenerationRequest {
            chain: &chain,
            manipulator: "arm",
            problem_type: ProblemType::Translation3D,
            partition: &p,
            options: &opts,
        };
        let config = GeneratorConfig {
            program: "true".into(),
            args: Vec::new(),
        };
        let err = CommandGenerator::new(config, "tri.urdf")
            .generate(&request)
            .unwrap_err();
        assert!(matches!(err, ForgeError::GenerationFailed { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn failing_program_is_generation_failure() {
        let chain = chain();
        let p = partition(&chain.joint_ids(), 3, None).unwrap();
        let opts = GenerateOptions::default();
        let request = GenerationRequest {
            chain: &chain,
            manipulator: "arm",
            problem_type: ProblemType::Translation3D,
            partition: &p,
            options: &opts,
        };
        let config = GeneratorConfig {
            program: "false".into(),
            args: Vec::new(),
        };
        let err = CommandGenerator::new(config, "tri.urdf")
            .generate(&request)
            .unwrap_err();
        assert_eq!(err.kind(), "GenerationFailed");
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_source_is_rejected_not_rewritten() {
        let chain = chain();
        let p = partition(&chain.joint_ids(), 3, None).unwrap();
        let opts = GenerateOptions::default();
        let request = GenerationRequest {
            chain: &chain,
            manipulator: "arm",
            problem_type: ProblemType::Translation3D,
            partition: &p,
            options: &opts,
        };
        let sh = |script: &str| GeneratorConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "ikfast".into()],
        };

        let err = CommandGenerator::new(sh("printf 'int x = 1;\\377\\n'"), "tri.urdf")
            .generate(&request)
            .unwrap_err();
        assert!(matches!(
            err,
            ForgeError::GenerationFailed { ref message, .. } if message.contains("offset 10")
        ));

        let source = CommandGenerator::new(sh("printf 'int x = 1;\\n'"), "tri.urdf")
            .generate(&request)
            .unwrap();
        assert_eq!(source, "int x = 1;\n");
    }
}
