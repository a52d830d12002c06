//! `IkModel` from generation through load and evaluation.

use ikforge_build::{BuildPipeline, FreeJointPolicy};
use ikforge_core::{AutogeneratePreset, ForgeError, IkTarget, ProblemType};
use ikforge_env::{Environment, IkModel, RandomConfigEvaluator};
use ikforge_test_utils::{
    InMemoryLoader, RecordingGenerator, RecordingToolchain, joint_limits, pan_tilt_chain,
    random_configuration, six_dof_chain,
};

const MACRO: &str = "IKFAST_CLIBRARY";

#[test]
fn generate_load_evaluate_pan_tilt() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let mut env = Environment::new(Box::new(InMemoryLoader::new()));
    env.add_manipulator("head", pan_tilt_chain());
    let mut model = IkModel::new("head", pan_tilt_chain(), ProblemType::Direction3D);

    assert!(!model.has(&env));
    model.generate(&pipeline, false).unwrap();
    let handle = model.load(&mut env, &pipeline).unwrap();
    assert_eq!(handle.solve_joints(), &[0, 1]);
    assert!(handle.free_joints().is_empty());
    assert!(model.has(&env));
    model.save().unwrap();

    let report = model.evaluate(&RandomConfigEvaluator::new(11), 20).unwrap();
    assert_eq!(report.samples, 20);
    assert!(report.passes(0.9), "rate {}", report.rate());
}

#[test]
fn load_without_generate_is_load_failed() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let mut env = Environment::new(Box::new(InMemoryLoader::new()));
    env.add_manipulator("arm", six_dof_chain());
    let mut model = IkModel::new("arm", six_dof_chain(), ProblemType::FullPose6D);

    let err = model.load(&mut env, &pipeline).unwrap_err();
    assert_eq!(err.kind(), "LoadFailed");
    assert!(!model.has(&env));
    assert_eq!(generator.calls(), 0);
}

#[test]
fn evaluate_before_load_is_rejected() {
    let model = IkModel::new("arm", six_dof_chain(), ProblemType::FullPose6D);
    let err = model.evaluate(&RandomConfigEvaluator::new(0), 5).unwrap_err();
    assert!(matches!(err, ForgeError::InvalidConfiguration(_)));
}

#[test]
fn loaded_solver_reaches_a_sampled_position() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let chain = six_dof_chain();
    let mut env = Environment::new(Box::new(InMemoryLoader::new()));
    env.add_manipulator("arm", chain.clone());
    let mut model = IkModel::new("arm", chain.clone(), ProblemType::Translation3D)
        .with_free_joints(vec![3, 4, 5]);
    model.generate(&pipeline, false).unwrap();
    let handle = model.load(&mut env, &pipeline).unwrap();

    let q = random_configuration(&joint_limits(&chain), 5);
    let target = IkTarget::from_pose(ProblemType::Translation3D, &chain.forward_kinematics(&q));
    let solutions = handle.solver().solve(&target, &q[3..]);
    assert!(!solutions.is_empty());

    let mut reached = q.clone();
    reached[..3].copy_from_slice(&solutions[0]);
    let (pos_err, _) = target.error_to(&chain.forward_kinematics(&reached));
    assert!(pos_err < 1e-3, "position error {pos_err}");
}

#[test]
fn partition_policy_changes_the_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let base = IkModel::new("arm", six_dof_chain(), ProblemType::Translation3D)
        .with_policy(FreeJointPolicy::FromBase);
    let tip = IkModel::new("arm", six_dof_chain(), ProblemType::Translation3D)
        .with_policy(FreeJointPolicy::FromTip);
    assert_ne!(base.key().unwrap(), tip.key().unwrap());

    let a = base.generate(&pipeline, false).unwrap();
    let b = tip.generate(&pipeline, false).unwrap();
    assert_ne!(a.library_path, b.library_path);
    assert_eq!(generator.calls(), 2);
}

// ---------------------------------------------------------------------------
// Autogenerate
// ---------------------------------------------------------------------------

#[test]
fn autogenerate_applies_matching_preset() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let chain = six_dof_chain();
    let presets = vec![
        AutogeneratePreset {
            fingerprint: "0".repeat(32),
            manipulator: "arm".into(),
            problem_type: ProblemType::Translation3D,
            free_joints: vec![0, 1, 2],
        },
        AutogeneratePreset {
            fingerprint: chain.fingerprint().to_owned(),
            manipulator: "arm".into(),
            problem_type: ProblemType::Translation3D,
            free_joints: vec![3, 4, 5],
        },
    ];
    let mut model = IkModel::new("arm", chain, ProblemType::Translation3D);
    let artifact = model.autogenerate(&pipeline, &presets, false, false).unwrap();

    let key = model.key().unwrap();
    assert_eq!(key.free_joints(), &[3, 4, 5]);
    assert_eq!(key.solve_joints(), &[0, 1, 2]);
    assert_eq!(artifact, pipeline.artifact_for(&key));
    assert!(artifact.library_path.exists());
}

#[test]
fn autogenerate_without_preset_needs_force() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let mut model = IkModel::new("arm", six_dof_chain(), ProblemType::FullPose6D);
    let err = model.autogenerate(&pipeline, &[], false, false).unwrap_err();
    assert!(matches!(err, ForgeError::InvalidConfiguration(ref m) if m.contains("no autogenerate preset")));
    assert_eq!(generator.calls(), 0);

    model.autogenerate(&pipeline, &[], true, false).unwrap();
    assert_eq!(generator.calls(), 1);
    assert_eq!(toolchain.links(), 1);
}

#[test]
fn forced_autogenerate_rebuilds_cached_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let generator = RecordingGenerator::new();
    let toolchain = RecordingToolchain::new();
    let pipeline = BuildPipeline::new(&generator, &toolchain, dir.path(), MACRO);

    let chain = six_dof_chain();
    let presets = vec![AutogeneratePreset {
        fingerprint: chain.fingerprint().to_owned(),
        manipulator: "arm".into(),
        problem_type: ProblemType::Translation3D,
        free_joints: vec![3, 4, 5],
    }];
    let mut model = IkModel::new("arm", chain, ProblemType::Translation3D);
    model.autogenerate(&pipeline, &presets, true, false).unwrap();
    model.autogenerate(&pipeline, &presets, true, false).unwrap();
    assert_eq!(generator.calls(), 1, "second call is a cache hit");

    model.autogenerate(&pipeline, &presets, true, true).unwrap();
    assert_eq!(generator.calls(), 2);
    assert_eq!(toolchain.compiles(), 2);

    let mut fallback = IkModel::new("arm", six_dof_chain(), ProblemType::FullPose6D);
    fallback.autogenerate(&pipeline, &[], true, false).unwrap();
    fallback.autogenerate(&pipeline, &[], true, true).unwrap();
    assert_eq!(generator.calls(), 4);
    assert_eq!(toolchain.links(), 4);
}
