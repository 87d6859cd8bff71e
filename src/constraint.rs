//! Segment-length relaxation ("stiffness") for a particle chain.

use glam::Vec3;

use crate::chain::ParticleChain;
use crate::observer::StepObserver;
use crate::particle::Particle;

/// Segments shorter than this have no usable direction and are skipped.
const DEGENERATE_LENGTH: f32 = 1e-10;

/// A rest-length constraint between two particles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DistanceConstraint {
    pub a: usize,
    pub b: usize,
    pub rest_length: f32,
    pub stiffness: f32,
}

impl DistanceConstraint {
    pub fn new(a: usize, b: usize, rest_length: f32, stiffness: f32) -> Self {
        DistanceConstraint { a, b, rest_length, stiffness }
    }

    /// Move the pair toward the rest length.
    ///
    /// A free particle next to an attached one takes the whole correction; two
    /// free particles split it. Attached particles are never moved.
    pub fn solve(&self, particles: &mut [Particle]) {
        let a_attached = particles[self.a].attached;
        let b_attached = particles[self.b].attached;
        if a_attached && b_attached {
            return;
        }

        let segment = particles[self.b].pos - particles[self.a].pos;
        let length = segment.length();
        if length < DEGENERATE_LENGTH {
            return;
        }

        let stretch = length - self.rest_length;
        let correction: Vec3 = segment / length * stretch * self.stiffness;

        if a_attached {
            particles[self.b].pos -= correction;
        } else if b_attached {
            particles[self.a].pos += correction;
        } else {
            particles[self.a].pos += correction * 0.5;
            particles[self.b].pos -= correction * 0.5;
        }
    }
}

/// Gauss–Seidel relaxation over every adjacent pair of a chain.
///
/// More iterations give a stiffer rope at a linear cost. A stiffness above
/// 1.0 overshoots the rest length on each pass, below 1.0 leaves some slack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintSolver {
    pub stiffness: f32,
    pub iterations: usize,
}

impl ConstraintSolver {
    pub fn new(stiffness: f32, iterations: usize) -> Self {
        ConstraintSolver { stiffness, iterations }
    }

    pub fn relax<O: StepObserver>(&self, chain: &mut ParticleChain, observer: &mut O) {
        let rest_length = chain.rest_length();
        let segments = chain.segment_count();
        let particles = chain.particles_mut();

        for i in 0..self.iterations {
            for s in 0..segments {
                DistanceConstraint::new(s, s + 1, rest_length, self.stiffness).solve(particles);
            }
            observer.on_constraint_iteration(i);
        }
    }
}
