//! Ordered particle storage for one rope.

use glam::{Quat, Vec3};
use rand::Rng;

use crate::error::RopeError;
use crate::particle::Particle;

/// Start and end closer than this are treated as coincident.
const COINCIDENT_EPSILON: f32 = 1e-6;

/// An ordered run of particles with a uniform segment rest length.
///
/// Particles live in one contiguous vector and are addressed by index. The
/// particle count is fixed for the life of a chain; reconfiguring a rope
/// replaces the chain as a whole.
#[derive(Clone, Debug)]
pub struct ParticleChain {
    particles: Vec<Particle>,
    rest_length: f32,
}

impl ParticleChain {
    /// Lay `count` particles evenly along the line from `start` to `end`.
    ///
    /// When both points coincide (a rope that has not been deployed yet) each
    /// particle gets an independent offset in `[-jitter, jitter]` per axis,
    /// applied to both the current and the previous position, so segment
    /// directions are defined from the first step on.
    pub fn between<R: Rng>(
        start: Vec3,
        end: Vec3,
        initial_acceleration: Vec3,
        count: usize,
        segment_length: f32,
        jitter: f32,
        rng: &mut R,
    ) -> Result<Self, RopeError> {
        if count < 2 {
            return Err(RopeError::InsufficientParticles { count });
        }

        let unwrapping = start.distance(end) < COINCIDENT_EPSILON;
        let last = (count - 1) as f32;
        let mut particles = Vec::with_capacity(count);

        for i in 0..count {
            let mut pos = start.lerp(end, i as f32 / last);
            if unwrapping && jitter > 0.0 {
                pos += Vec3::new(
                    rng.gen_range(-jitter..=jitter),
                    rng.gen_range(-jitter..=jitter),
                    rng.gen_range(-jitter..=jitter),
                );
            }
            let mut particle = Particle::new(pos);
            particle.acceleration = initial_acceleration;
            particles.push(particle);
        }

        let mut chain = ParticleChain { particles, rest_length: segment_length };
        chain.update_frames();
        Ok(chain)
    }

    /// Build a chain from externally supplied positions.
    ///
    /// Nothing is attached and accelerations are zero. The rest length is the
    /// polyline length spread evenly over the segments.
    pub fn from_positions(positions: &[Vec3]) -> Result<Self, RopeError> {
        if positions.len() < 2 {
            return Err(RopeError::InsufficientParticles { count: positions.len() });
        }
        let total: f32 = positions.windows(2).map(|w| w[0].distance(w[1])).sum();
        let particles = positions.iter().map(|&p| Particle::new(p)).collect();
        let mut chain = ParticleChain {
            particles,
            rest_length: total / (positions.len() - 1) as f32,
        };
        chain.update_frames();
        Ok(chain)
    }

    /// Override the segment rest length.
    pub fn with_rest_length(mut self, rest_length: f32) -> Self {
        self.rest_length = rest_length;
        self
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.particles.len().saturating_sub(1)
    }

    pub fn rest_length(&self) -> f32 {
        self.rest_length
    }

    /// Rest length of the whole rope.
    pub fn total_rest_length(&self) -> f32 {
        self.rest_length * self.segment_count() as f32
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn particle(&self, index: usize) -> &Particle {
        &self.particles[index]
    }

    pub fn particle_mut(&mut self, index: usize) -> &mut Particle {
        &mut self.particles[index]
    }

    /// Checked access to a particle.
    pub fn get(&self, index: usize) -> Result<&Particle, RopeError> {
        self.particles.get(index).ok_or(RopeError::ParticleOutOfBounds {
            index,
            count: self.particles.len(),
        })
    }

    pub fn last(&self) -> &Particle {
        &self.particles[self.particles.len() - 1]
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.particles.iter().map(|p| p.pos).collect()
    }

    pub fn attach(&mut self, index: usize) -> Result<(), RopeError> {
        let count = self.particles.len();
        let particle = self
            .particles
            .get_mut(index)
            .ok_or(RopeError::ParticleOutOfBounds { index, count })?;
        particle.attach();
        Ok(())
    }

    pub fn detach(&mut self, index: usize) -> Result<(), RopeError> {
        let count = self.particles.len();
        let particle = self
            .particles
            .get_mut(index)
            .ok_or(RopeError::ParticleOutOfBounds { index, count })?;
        particle.detach();
        Ok(())
    }

    pub fn is_attached(&self, index: usize) -> bool {
        self.particles.get(index).map_or(false, |p| p.attached)
    }

    /// Pin a particle and drive it to `pos`.
    pub fn set_attached_position(&mut self, index: usize, pos: Vec3) {
        let particle = &mut self.particles[index];
        particle.attach();
        particle.move_to(pos);
    }

    /// Length of segment `segment` (between particles `segment` and `segment + 1`).
    pub fn segment_length(&self, segment: usize) -> f32 {
        self.particles[segment].pos.distance(self.particles[segment + 1].pos)
    }

    /// How far segment `segment` is beyond its rest length. Negative when compressed.
    pub fn segment_stretch(&self, segment: usize) -> f32 {
        self.segment_length(segment) - self.rest_length
    }

    /// Stretch of the segment that ends at particle `index`, if any.
    pub fn trailing_stretch(&self, index: usize) -> Option<f32> {
        if index == 0 || index >= self.particles.len() {
            return None;
        }
        Some(self.segment_stretch(index - 1))
    }

    /// Current length of the polyline through all particles.
    pub fn current_length(&self) -> f32 {
        self.particles.windows(2).map(|w| w[0].pos.distance(w[1].pos)).sum()
    }

    /// Largest relative overstretch of any segment.
    pub fn max_stretch_ratio(&self) -> f32 {
        if self.rest_length <= 0.0 {
            return 0.0;
        }
        (0..self.segment_count())
            .map(|s| self.segment_stretch(s) / self.rest_length)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Axis-aligned bounds of the current positions as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        self.particles.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), p| (lo.min(p.pos), hi.max(p.pos)),
        )
    }

    /// Recompute tangent, normal and binormal of every particle.
    ///
    /// Tangents use central differences, one-sided at the ends. Normals are
    /// parallel-transported along the chain so the frame does not flip.
    pub fn update_frames(&mut self) {
        let n = self.particles.len();
        let mut previous: Option<(Vec3, Vec3)> = None;

        for i in 0..n {
            let ahead = self.particles[(i + 1).min(n - 1)].pos;
            let behind = self.particles[i.saturating_sub(1)].pos;
            let tangent = (ahead - behind)
                .try_normalize()
                .or(previous.map(|(t, _)| t))
                .unwrap_or(Vec3::X);

            let normal = match previous {
                Some((t0, n0)) => {
                    let transported = Quat::from_rotation_arc(t0, tangent) * n0;
                    (transported - tangent * transported.dot(tangent))
                        .try_normalize()
                        .unwrap_or_else(|| initial_normal(tangent))
                }
                None => initial_normal(tangent),
            };

            let particle = &mut self.particles[i];
            particle.tangent = tangent;
            particle.normal = normal;
            particle.binormal = tangent.cross(normal);
            previous = Some((tangent, normal));
        }
    }
}

/// Normal closest to world up that is perpendicular to `tangent`.
fn initial_normal(tangent: Vec3) -> Vec3 {
    (Vec3::Y - tangent * tangent.dot(Vec3::Y))
        .try_normalize()
        .unwrap_or_else(|| tangent.any_orthonormal_vector())
}
