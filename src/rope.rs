//! A single simulated rope: chain ownership, anchoring and the step pipeline.

use glam::Vec3;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::chain::ParticleChain;
use crate::collision::{CollisionPolicy, CollisionResolver};
use crate::config::RopeConfig;
use crate::constraint::ConstraintSolver;
use crate::error::RopeError;
use crate::force::{ForceAccumulator, TurbulenceField, ValueNoise};
use crate::joint::AnchorBinding;
use crate::observer::{NoOpStepObserver, StepObserver};
use crate::query::{BodyLayer, CollisionQuery, SceneQuery};
use crate::scheduler::{Scheduler, TickDecision, VisibilityOracle};

/// External services a rope may consult during a call.
///
/// Every service is optional. Without a query service the rope does not
/// collide; without a body layer, body anchors resolve to nothing; without a
/// visibility oracle the rope counts as visible; without a turbulence field
/// the rope's own seeded noise drives the wind.
#[derive(Clone, Copy, Default)]
pub struct Environment<'a> {
    pub query: Option<&'a dyn CollisionQuery>,
    pub bodies: Option<&'a dyn BodyLayer>,
    pub visibility: Option<&'a dyn VisibilityOracle>,
    pub turbulence: Option<&'a dyn TurbulenceField>,
}

impl<'a> Environment<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `scene` both for collision queries and as the body layer.
    pub fn scene(scene: &'a SceneQuery) -> Self {
        Environment {
            query: Some(scene as &dyn CollisionQuery),
            bodies: Some(scene as &dyn BodyLayer),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: &'a dyn CollisionQuery) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_bodies(mut self, bodies: &'a dyn BodyLayer) -> Self {
        self.bodies = Some(bodies);
        self
    }

    pub fn with_visibility(mut self, visibility: &'a dyn VisibilityOracle) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn with_turbulence(mut self, turbulence: &'a dyn TurbulenceField) -> Self {
        self.turbulence = Some(turbulence);
        self
    }
}

/// One rope simulation instance.
///
/// The rope owns its particle chain and collision tracking state. Anchors
/// are plain body ids resolved through the [`Environment`] on every step, so
/// bodies may disappear at any time; the start then falls back to the rope's
/// `origin` and the end is released.
pub struct Rope {
    config: RopeConfig,
    binding: AnchorBinding,
    origin: Vec3,
    chain: ParticleChain,
    forces: ForceAccumulator,
    solver: ConstraintSolver,
    collision: CollisionResolver,
    scheduler: Scheduler,
    noise: ValueNoise,
    elapsed: f64,
}

impl Rope {
    /// Build and pre-warm a rope. Fails if `config` is invalid.
    pub fn new(
        origin: Vec3,
        binding: AnchorBinding,
        config: RopeConfig,
        env: Environment<'_>,
    ) -> Result<Self, RopeError> {
        config.validate()?;
        let chain = build_chain(&config, &binding, origin, env.bodies)?;

        let mut rope = Rope {
            forces: ForceAccumulator::from_config(&config),
            solver: ConstraintSolver::new(config.stiffness, config.stiffness_iterations),
            collision: CollisionResolver::new(CollisionPolicy::from_config(&config)),
            scheduler: Scheduler::from_config(&config),
            noise: ValueNoise::new(config.seed, config.wind_frequency),
            config,
            binding,
            origin,
            chain,
            elapsed: 0.0,
        };
        rope.prewarm(env);
        Ok(rope)
    }

    pub fn config(&self) -> &RopeConfig {
        &self.config
    }

    pub fn binding(&self) -> &AnchorBinding {
        &self.binding
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Particles for rendering.
    pub fn chain(&self) -> &ParticleChain {
        &self.chain
    }

    pub fn particle_count(&self) -> usize {
        self.chain.len()
    }

    pub fn rest_length(&self) -> f32 {
        self.chain.rest_length()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn collision(&self) -> &CollisionResolver {
        &self.collision
    }

    /// Simulated time since the current chain was built, warm-up included.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Position used for the start when it has no usable anchor.
    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
    }

    /// Apply a new configuration and recreate the chain.
    ///
    /// On error the rope keeps its previous configuration and chain.
    pub fn reconfigure(&mut self, config: RopeConfig, env: Environment<'_>) -> Result<(), RopeError> {
        let chain = config
            .validate()
            .and_then(|_| build_chain(&config, &self.binding, self.origin, env.bodies))
            .map_err(|e| {
                warn!("rejected rope configuration: {e}");
                e
            })?;

        self.forces = ForceAccumulator::from_config(&config);
        self.solver = ConstraintSolver::new(config.stiffness, config.stiffness_iterations);
        self.collision = CollisionResolver::new(CollisionPolicy::from_config(&config));
        self.scheduler = Scheduler::from_config(&config);
        self.noise = ValueNoise::new(config.seed, config.wind_frequency);
        self.config = config;
        self.chain = chain;
        self.elapsed = 0.0;
        self.prewarm(env);
        Ok(())
    }

    /// Bind new anchors and recreate the chain.
    pub fn rebind(&mut self, binding: AnchorBinding, env: Environment<'_>) -> Result<(), RopeError> {
        let chain = build_chain(&self.config, &binding, self.origin, env.bodies)?;
        self.binding = binding;
        self.install(chain, env);
        Ok(())
    }

    /// Throw away the current shape and start over from the anchors.
    pub fn reset(&mut self, env: Environment<'_>) -> Result<(), RopeError> {
        let chain = build_chain(&self.config, &self.binding, self.origin, env.bodies)?;
        self.install(chain, env);
        Ok(())
    }

    fn install(&mut self, chain: ParticleChain, env: Environment<'_>) {
        self.chain = chain;
        self.elapsed = 0.0;
        self.collision.clear_tracking();
        self.scheduler.force_frames(self.config.forced_frames);
        self.prewarm(env);
    }

    fn prewarm(&mut self, env: Environment<'_>) {
        let iterations = self.config.preprocess_iterations;
        let dt = self.config.nominal_dt;
        for _ in 0..iterations {
            self.step(dt, env, &mut NoOpStepObserver);
        }
        debug!(
            "rope ready: {} particles, rest length {:.4}, {} warm-up steps",
            self.chain.len(),
            self.chain.rest_length(),
            iterations
        );
    }

    /// Run one frame through the scheduler, stepping if it allows.
    pub fn tick<O: StepObserver>(
        &mut self,
        frame_dt: f32,
        env: Environment<'_>,
        observer: &mut O,
    ) -> TickDecision {
        let visible = match env.visibility {
            Some(oracle) if self.scheduler.needs_visibility() => {
                let (min, max) = self.chain.bounds();
                oracle.is_visible(min, max)
            }
            _ => true,
        };

        let decision = self.scheduler.decide(frame_dt, visible);
        if let TickDecision::Step { dt } = decision {
            self.step(dt, env, observer);
        }
        decision
    }

    /// Run one full simulation step of `dt` seconds, ignoring the scheduler.
    ///
    /// Returns the number of collision corrections.
    pub fn step<O: StepObserver>(&mut self, dt: f32, env: Environment<'_>, observer: &mut O) -> usize {
        self.refresh_anchors(env.bodies);

        let field: &dyn TurbulenceField = match env.turbulence {
            Some(field) => field,
            None => &self.noise,
        };
        self.forces.apply(self.chain.particles_mut(), Some(field), self.elapsed);
        observer.on_forces();

        for p in self.chain.particles_mut() {
            p.integrate(dt);
        }
        observer.on_integrate();

        self.solver.relax(&mut self.chain, observer);

        let exclude = self.binding.bodies();
        let corrections = self.collision.resolve(&mut self.chain, env.query, &exclude, observer);

        self.chain.update_frames();
        self.elapsed += dt as f64;
        observer.on_step_complete();
        corrections
    }

    /// Pin the ends to their anchors' current positions.
    fn refresh_anchors(&mut self, bodies: Option<&dyn BodyLayer>) {
        let start = self.binding.resolve_start(bodies, self.origin);
        self.chain.set_attached_position(0, start);

        let last = self.chain.len() - 1;
        match self.binding.resolve_end(bodies) {
            Some(end) => self.chain.set_attached_position(last, end),
            None => self.chain.particle_mut(last).detach(),
        }
    }
}

/// Lay out a fresh chain for `binding`.
///
/// A free end is laid out along gravity (or straight down without gravity)
/// at the full rope length.
fn build_chain(
    config: &RopeConfig,
    binding: &AnchorBinding,
    origin: Vec3,
    bodies: Option<&dyn BodyLayer>,
) -> Result<ParticleChain, RopeError> {
    let start = binding.resolve_start(bodies, origin);
    let hang = config
        .gravity
        .try_normalize()
        .filter(|_| config.gravity_enabled)
        .unwrap_or(Vec3::NEG_Y);
    let end = binding
        .end
        .and_then(|anchor| anchor.resolve(bodies))
        .unwrap_or(start + hang * config.rope_length);

    let initial_acceleration = if config.gravity_enabled {
        config.gravity * config.gravity_scale
    } else {
        Vec3::ZERO
    };

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut chain = ParticleChain::between(
        start,
        end,
        initial_acceleration,
        config.particle_count,
        config.segment_length(),
        config.unwrap_jitter,
        &mut rng,
    )?;

    chain.attach(0)?;
    if binding.resolve_end(bodies).is_some() {
        chain.attach(chain.len() - 1)?;
    }
    debug!(
        "created rope chain: {} particles from {:?} to {:?}",
        chain.len(),
        start,
        end
    );
    Ok(chain)
}
