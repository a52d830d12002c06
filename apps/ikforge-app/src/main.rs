//! ikforge CLI.
//!
//! Derives (or reuses) the analytic IK solver for one manipulator of a URDF
//! robot, loads it, and optionally measures its success rate:
//!
//! ```text
//! ikforge --robot arm.urdf --base-link base_link --ee-link tool0 --numiktests 100
//! ```
//!
//! Prints the path of the solver library on success. Any failure is reported
//! as `error[<kind>]: <message>` with a non-zero exit code; a success rate
//! below the configured minimum exits with 1.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ikforge_build::{BuildPipeline, CcToolchain, CommandGenerator};
use ikforge_core::{ConfigError, ForgeConfig, ForgeError, JointId, ProblemType};
use ikforge_env::{Environment, IkModel, NativeLoader, RandomConfigEvaluator};
use ikforge_urdf::{KinematicChain, UrdfError, parse_file};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Derive, build, load and test an analytic inverse kinematics solver.
#[derive(Parser, Debug)]
#[command(name = "ikforge", version, about)]
struct Cli {
    /// URDF file describing the robot.
    #[arg(short, long)]
    robot: PathBuf,

    /// Manipulator name used in artifact and registry names.
    #[arg(short, long, default_value = "arm")]
    manipulator: String,

    /// Link the chain starts at.
    #[arg(long)]
    base_link: String,

    /// Link the solver places.
    #[arg(long)]
    ee_link: String,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Artifact cache root (overrides the configuration).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Hold this joint index as a free parameter. Repeatable.
    #[arg(long = "freejoint", value_name = "JOINT_INDEX")]
    free_joints: Vec<JointId>,

    /// Decimal digits used by the generator.
    #[arg(long)]
    precision: Option<u32>,

    /// Zero threshold used by the generator.
    #[arg(long)]
    accuracy: Option<f64>,

    /// Regenerate and rebuild even when cached artifacts exist.
    #[arg(long)]
    force: bool,

    /// Solve for end-effector orientation only.
    #[arg(long)]
    rotation3donly: bool,

    /// Solve for the direction of the end-effector z axis only.
    #[arg(long)]
    rotation2donly: bool,

    /// Solve for end-effector position only.
    #[arg(long)]
    translation3donly: bool,

    /// Fix joints outside the solve set instead of exposing them as free.
    #[arg(long)]
    usedummyjoints: bool,

    /// Use the configured free joint preset for this robot.
    #[arg(long)]
    autogenerate: bool,

    /// Evaluate the loaded solver on this many random configurations.
    #[arg(long, default_value_t = 0)]
    numiktests: usize,

    /// Debug logging (overridden by RUST_LOG).
    #[arg(short, long)]
    verbose: bool,
}

/// Problem type selected by the `--*only` flags.
///
/// Flags are applied in a fixed order regardless of their position on the
/// command line: `--translation3donly` beats `--rotation2donly`, which beats
/// `--rotation3donly`.
const fn problem_type_from(cli: &Cli) -> ProblemType {
    if cli.translation3donly {
        ProblemType::Translation3D
    } else if cli.rotation2donly {
        ProblemType::Direction3D
    } else if cli.rotation3donly {
        ProblemType::Rotation3D
    } else {
        ProblemType::FullPose6D
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Forge(#[from] ForgeError),

    #[error(transparent)]
    Urdf(#[from] UrdfError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CliError {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Forge(e) => e.kind(),
            Self::Urdf(_) => "Robot",
            Self::Config(_) => "Config",
        }
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn load_config(cli: &Cli) -> Result<ForgeConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ForgeConfig::from_file(path)?
        }
        None => ForgeConfig::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.output_dir.clone_from(dir);
    }
    if let Some(precision) = cli.precision {
        config.generate.precision = precision;
    }
    if let Some(accuracy) = cli.accuracy {
        config.generate.accuracy = accuracy;
    }
    if cli.usedummyjoints {
        config.generate.use_dummy_joints = true;
    }

    config.validate()?;
    Ok(config)
}

fn load_chain(cli: &Cli) -> Result<KinematicChain, UrdfError> {
    let model = parse_file(&cli.robot)?;
    let chain = KinematicChain::from_model(&model, &cli.base_link, &cli.ee_link)?;
    info!(
        robot = %cli.robot.display(),
        fingerprint = chain.fingerprint(),
        dof = chain.dof(),
        "kinematic chain extracted"
    );
    Ok(chain)
}

fn run(cli: &Cli, problem_type: ProblemType) -> Result<ExitCode, CliError> {
    let config = load_config(cli)?;
    let chain = load_chain(cli)?;

    let generator = CommandGenerator::new(config.generator.clone(), &cli.robot)
        .with_timeout_secs(config.timeouts.generate_secs);
    let toolchain = CcToolchain::new(config.toolchain.clone()).with_timeouts(config.timeouts);
    let pipeline = BuildPipeline::new(
        &generator,
        &toolchain,
        &config.output_dir,
        &config.toolchain.build_macro,
    );

    let mut model = IkModel::new(&cli.manipulator, chain.clone(), problem_type)
        .with_options(config.generate.clone());
    if !cli.free_joints.is_empty() {
        model = model.with_free_joints(cli.free_joints.clone());
    }

    let artifact = if cli.autogenerate {
        model.autogenerate(&pipeline, &config.presets, true, cli.force)?
    } else {
        model.generate(&pipeline, cli.force)?
    };
    debug!(source = %artifact.source_path.display(), "solver source");

    let mut env = Environment::new(Box::new(NativeLoader));
    env.add_manipulator(&cli.manipulator, chain);
    let handle = model.load(&mut env, &pipeline)?;
    info!(key = %handle.name(), "ik solver ready");
    model.save()?;

    if cli.numiktests > 0 {
        let evaluator = RandomConfigEvaluator::new(config.sample_seed);
        let report = model.evaluate(&evaluator, cli.numiktests)?;
        println!(
            "success rate {:.3} ({}/{})",
            report.rate(),
            report.successes,
            report.samples
        );
        if !report.passes(config.min_success_rate) {
            warn!(
                rate = report.rate(),
                min = config.min_success_rate,
                "success rate below minimum"
            );
            return Ok(ExitCode::from(1));
        }
    }

    println!("{}", artifact.library_path.display());
    Ok(ExitCode::SUCCESS)
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli, problem_type_from(&cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error[{}]: {e}", e.kind());
            ExitCode::from(2)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
