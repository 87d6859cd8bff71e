//! Verlet cable and rope simulation for interactive 3D applications.
//!
//! `ropesim` computes, every frame, the shape of a flexible connector hanging
//! between two anchors (or from one). It is a small position-based solver:
//! particles are advanced with Verlet integration, segment lengths are relaxed
//! back toward their rest length, and a collision policy keeps particles out
//! of static geometry and nearby moving bodies.
//!
//! # Features
//!
//! - **Verlet integration**: implicit velocity, no velocity storage
//! - **Stiffness relaxation**: Gauss–Seidel segment constraints, tunable overshoot
//! - **Forces**: gravity, scrolling turbulence wind, first-order drag
//! - **Collision policy**: static stop/slide, dynamic body tracking, stretch-based ignore
//! - **Anchors & joints**: body or point anchors, distance-triggered force joints
//! - **Scheduling**: visibility gating, rate throttling, stall skipping, pre-warming
//! - **Observable**: Monitor physics steps via the `StepObserver` trait
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use ropesim::{Anchor, AnchorBinding, Environment, NoOpStepObserver, Rope, RopeConfig};
//!
//! let binding = AnchorBinding::hanging(Anchor::point(Vec3::new(0.0, 5.0, 0.0)));
//! let config = RopeConfig::new().with_particle_count(12).with_rope_length(3.0);
//! let mut rope = Rope::new(Vec3::ZERO, binding, config, Environment::new()).unwrap();
//!
//! for _ in 0..60 {
//!     rope.tick(1.0 / 60.0, Environment::new(), &mut NoOpStepObserver);
//! }
//! assert!(rope.chain().last().pos.y < 5.0);
//! ```

pub mod particle;
pub mod chain;
pub mod force;
pub mod constraint;
pub mod query;
pub mod collision;
pub mod joint;
pub mod scheduler;
pub mod rope;
pub mod observer;
pub mod config;
pub mod error;

// Re-export primary API
pub use particle::Particle;
pub use chain::ParticleChain;
pub use force::{ForceAccumulator, TurbulenceField, ValueNoise, Wind, NOISE_PERIOD};
pub use constraint::{ConstraintSolver, DistanceConstraint};
pub use query::{
    BodyId, BodyLayer, CollisionQuery, ForceTarget, LayerMask, OverlapHit, RayHit, SceneBody, SceneQuery,
    StaticShape,
};
pub use collision::{CollisionChannel, CollisionPolicy, CollisionResolver, TrackedBody};
pub use joint::{Anchor, AnchorBinding, ForceJoint};
pub use scheduler::{Scheduler, SchedulerStats, SimulationMode, SkipReason, TickDecision, VisibilityOracle};
pub use rope::{Environment, Rope};
pub use observer::{NoOpStepObserver, StepCounter, StepObserver};
pub use config::RopeConfig;
pub use error::RopeError;
pub use glam::Vec3;
