//! Configuration for a simulated rope.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::RopeError;
use crate::query::LayerMask;
use crate::scheduler::SimulationMode;

/// Every tunable of a rope, in one flat structure.
///
/// Changing the configuration of a live [`Rope`](crate::Rope) goes through
/// [`Rope::reconfigure`](crate::Rope::reconfigure), which validates it and
/// recreates the chain.
///
/// # Builder Pattern
/// ```
/// use ropesim::RopeConfig;
/// use glam::Vec3;
///
/// let config = RopeConfig::new()
///     .with_particle_count(16)
///     .with_rope_length(4.0)
///     .with_stiffness(1.0, 4)
///     .with_gravity(Vec3::new(0.0, -9.81, 0.0))
///     .with_target_rate(30.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RopeConfig {
    /// Number of simulated points, including both ends. Default: 20.
    pub particle_count: usize,
    /// Total rest length of the rope. Default: 5.0.
    pub rope_length: f32,
    /// Per-axis bound of the random offset used when both ends coincide. Default: 0.005.
    pub unwrap_jitter: f32,
    /// Seed for the unwrap jitter and the built-in turbulence field.
    pub seed: u64,

    /// Segment correction factor, 1.0 restores the rest length exactly. Default: 1.0.
    pub stiffness: f32,
    /// Relaxation passes per step. Default: 2.
    pub stiffness_iterations: usize,

    pub gravity_enabled: bool,
    /// Gravity acceleration. Default: (0, -9.81, 0).
    pub gravity: Vec3,
    pub gravity_scale: f32,

    pub wind_enabled: bool,
    pub wind_direction: Vec3,
    /// Lower clamp of the sampled turbulence. Default: 0.0.
    pub wind_noise_min: f32,
    /// Upper clamp of the sampled turbulence. Default: 1.0.
    pub wind_noise_max: f32,
    /// How fast the turbulence field scrolls with elapsed time. Default: 1.0.
    pub wind_speed: f32,
    /// Spatial frequency of the built-in turbulence field. Default: 0.5.
    pub wind_frequency: f32,

    pub damping_enabled: bool,
    /// Drag coefficient applied against the per-step displacement. Default: 20.0.
    pub damping: f32,

    pub static_collision: bool,
    pub dynamic_collision: bool,
    pub static_mask: LayerMask,
    pub dynamic_mask: LayerMask,
    /// Distance kept between a particle and a surface it hit. Default: 0.05.
    pub collision_clearance: f32,
    /// Trailing-segment stretch ratio above which a hit slides instead of stopping. Default: 0.1.
    pub slide_stretch: f32,
    /// Trailing-segment stretch ratio above which collisions are skipped. Default: 1.0.
    pub ignore_stretch: f32,
    /// Probe length used against approaching bodies. Default: 0.3.
    pub dynamic_probe_length: f32,
    /// Margin added around the chain bounds when looking for movable bodies. Default: 0.5.
    pub tracking_margin: f32,
    /// Movable bodies tracked at once. Must be at least 1 when
    /// `dynamic_collision` is on. Default: 32.
    pub max_tracked_bodies: usize,

    pub mode: SimulationMode,
    /// Ask the visibility oracle before stepping in `RunWhenVisible` mode.
    pub visibility_tracking: bool,
    /// Steps per second, 0 steps every frame. Default: 0.
    pub target_rate: f32,
    /// Frames run unconditionally after (re)configuration. Default: 3.
    pub forced_frames: u32,
    /// Steps run at creation before the rope is first shown. Default: 30.
    pub preprocess_iterations: u32,
    /// Timestep used for pre-warming. Default: 1/60.
    pub nominal_dt: f32,
    /// Frame times above this are treated as a stall and skipped. Default: 0.25.
    pub stall_threshold: f32,
}

impl RopeConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        RopeConfig {
            particle_count: 20,
            rope_length: 5.0,
            unwrap_jitter: 0.005,
            seed: 0x5eed,

            stiffness: 1.0,
            stiffness_iterations: 2,

            gravity_enabled: true,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            gravity_scale: 1.0,

            wind_enabled: false,
            wind_direction: Vec3::X,
            wind_noise_min: 0.0,
            wind_noise_max: 1.0,
            wind_speed: 1.0,
            wind_frequency: 0.5,

            damping_enabled: true,
            damping: 20.0,

            static_collision: true,
            dynamic_collision: false,
            static_mask: LayerMask::ALL,
            dynamic_mask: LayerMask::ALL,
            collision_clearance: 0.05,
            slide_stretch: 0.1,
            ignore_stretch: 1.0,
            dynamic_probe_length: 0.3,
            tracking_margin: 0.5,
            max_tracked_bodies: 32,

            mode: SimulationMode::AlwaysRun,
            visibility_tracking: false,
            target_rate: 0.0,
            forced_frames: 3,
            preprocess_iterations: 30,
            nominal_dt: 1.0 / 60.0,
            stall_threshold: 0.25,
        }
    }

    /// Parse a configuration from JSON. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, RopeError> {
        let config: RopeConfig =
            serde_json::from_str(text).map_err(|e| RopeError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, RopeError> {
        serde_json::to_string_pretty(self).map_err(|e| RopeError::Parse(e.to_string()))
    }

    /// Check every tunable. A rope never runs with a config that fails here.
    pub fn validate(&self) -> Result<(), RopeError> {
        if self.particle_count < 2 {
            return Err(RopeError::InsufficientParticles { count: self.particle_count });
        }
        if !self.rope_length.is_finite() || self.rope_length <= 0.0 {
            return Err(RopeError::InvalidLength(self.rope_length));
        }
        if !self.stiffness.is_finite() || !(0.0..=2.0).contains(&self.stiffness) {
            return Err(RopeError::InvalidStiffness(self.stiffness));
        }
        if self.stiffness_iterations == 0 {
            return Err(RopeError::InvalidConfiguration("stiffness_iterations must be at least 1"));
        }
        if !self.target_rate.is_finite() || self.target_rate < 0.0 {
            return Err(RopeError::InvalidRate(self.target_rate));
        }
        if !self.nominal_dt.is_finite() || self.nominal_dt <= 0.0 {
            return Err(RopeError::InvalidTimestep(self.nominal_dt));
        }
        if !self.stall_threshold.is_finite() || self.stall_threshold <= 0.0 {
            return Err(RopeError::InvalidTimestep(self.stall_threshold));
        }
        if !non_negative(self.unwrap_jitter) {
            return Err(RopeError::InvalidConfiguration("unwrap_jitter must be non-negative"));
        }
        if !self.wind_speed.is_finite() || !self.wind_frequency.is_finite() || self.wind_frequency < 0.0 {
            return Err(RopeError::InvalidConfiguration("wind speed and frequency must be finite"));
        }
        if self.wind_noise_min > self.wind_noise_max {
            return Err(RopeError::InvalidConfiguration("wind_noise_min exceeds wind_noise_max"));
        }
        if !non_negative(self.collision_clearance) || !non_negative(self.dynamic_probe_length) {
            return Err(RopeError::InvalidConfiguration("collision distances must be non-negative"));
        }
        if self.dynamic_collision && self.max_tracked_bodies == 0 {
            return Err(RopeError::InvalidConfiguration(
                "max_tracked_bodies must be at least 1 with dynamic collision",
            ));
        }
        if !non_negative(self.tracking_margin) {
            return Err(RopeError::InvalidConfiguration("tracking_margin must be non-negative"));
        }
        if !non_negative(self.damping) {
            return Err(RopeError::InvalidConfiguration("damping must be non-negative"));
        }
        Ok(())
    }

    /// Rest length of every segment for this configuration.
    pub fn segment_length(&self) -> f32 {
        self.rope_length / (self.particle_count.max(2) - 1) as f32
    }

    pub fn with_particle_count(mut self, count: usize) -> Self {
        self.particle_count = count;
        self
    }

    pub fn with_rope_length(mut self, length: f32) -> Self {
        self.rope_length = length;
        self
    }

    /// Set the stiffness factor and the number of relaxation passes.
    pub fn with_stiffness(mut self, stiffness: f32, iterations: usize) -> Self {
        self.stiffness = stiffness;
        self.stiffness_iterations = iterations;
        self
    }

    /// Set the gravity vector and enable gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self.gravity_enabled = true;
        self
    }

    pub fn without_gravity(mut self) -> Self {
        self.gravity_enabled = false;
        self
    }

    /// Enable wind along `direction`, with turbulence clamped to `[min, max]`.
    pub fn with_wind(mut self, direction: Vec3, min: f32, max: f32) -> Self {
        self.wind_enabled = true;
        self.wind_direction = direction;
        self.wind_noise_min = min;
        self.wind_noise_max = max;
        self
    }

    /// Set the damping coefficient, 0 disables damping.
    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self.damping_enabled = damping > 0.0;
        self
    }

    /// Toggle the static and dynamic collision channels.
    pub fn with_collisions(mut self, static_channel: bool, dynamic_channel: bool) -> Self {
        self.static_collision = static_channel;
        self.dynamic_collision = dynamic_channel;
        self
    }

    pub fn with_clearance(mut self, clearance: f32) -> Self {
        self.collision_clearance = clearance;
        self
    }

    /// Set the slide and ignore stretch ratios.
    pub fn with_stretch_policy(mut self, slide: f32, ignore: f32) -> Self {
        self.slide_stretch = slide;
        self.ignore_stretch = ignore;
        self
    }

    pub fn with_mode(mut self, mode: SimulationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_target_rate(mut self, rate: f32) -> Self {
        self.target_rate = rate;
        self
    }

    /// Set pre-warm steps and forced frames run after (re)configuration.
    pub fn with_warmup(mut self, preprocess_iterations: u32, forced_frames: u32) -> Self {
        self.preprocess_iterations = preprocess_iterations;
        self.forced_frames = forced_frames;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// False for negative values and NaN.
fn non_negative(value: f32) -> bool {
    value >= 0.0
}
