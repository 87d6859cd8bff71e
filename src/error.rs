//! Error types for rope configuration and chain construction.

use thiserror::Error;

/// Errors reported when a rope cannot be built or reconfigured.
///
/// A running simulation step never fails; every variant here is produced at
/// configuration or construction time, before any state is replaced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RopeError {
    /// A chain needs at least two particles to form a segment.
    #[error("rope needs at least 2 particles, got {count}")]
    InsufficientParticles { count: usize },
    /// Stiffness must be finite and in [0, 2].
    #[error("stiffness must be in [0, 2], got {0}")]
    InvalidStiffness(f32),
    /// Rope length must be positive and finite.
    #[error("rope length must be positive and finite, got {0}")]
    InvalidLength(f32),
    /// Target rate must be non-negative and finite.
    #[error("target rate must be non-negative and finite, got {0}")]
    InvalidRate(f32),
    /// Nominal timestep and stall threshold must be positive and finite.
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f32),
    /// Any other out-of-range tunable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    /// Particle index is out of bounds.
    #[error("particle index {index} out of bounds (count: {count})")]
    ParticleOutOfBounds { index: usize, count: usize },
    /// Configuration text could not be parsed.
    #[error("could not parse configuration: {0}")]
    Parse(String),
}
