//! Shared test fixtures and utilities for ikforge crates.
//!
//! Provides URDF fixtures, recording generator/toolchain stubs, an in-memory
//! library loader and deterministic RNG setup.

pub mod fixtures;
pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{eight_dof_chain, joint_limits, pan_tilt_chain, six_dof_chain};
pub use mocks::{InMemoryLoader, NullLibrary, RecordingGenerator, RecordingToolchain, fake_source};
pub use rng::{random_configuration, seeded_rng};
