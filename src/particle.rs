//! Verlet particles with position-based dynamics.

use glam::Vec3;

/// A point on the rope. Velocity is implicit in `pos - prev_pos`.
///
/// The orientation frame (`tangent`, `normal`, `binormal`) is written by
/// [`ParticleChain::update_frames`](crate::ParticleChain::update_frames) for
/// renderers; the solver never reads it back.
#[derive(Clone, Debug, PartialEq)]
pub struct Particle {
    pub pos: Vec3,
    pub prev_pos: Vec3,
    pub acceleration: Vec3,
    pub attached: bool,
    pub tangent: Vec3,
    pub normal: Vec3,
    pub binormal: Vec3,
}

impl Particle {
    pub fn new(pos: Vec3) -> Self {
        Particle {
            pos,
            prev_pos: pos,
            acceleration: Vec3::ZERO,
            attached: false,
            tangent: Vec3::X,
            normal: Vec3::Y,
            binormal: Vec3::Z,
        }
    }

    pub fn attached(pos: Vec3) -> Self {
        Particle {
            attached: true,
            ..Particle::new(pos)
        }
    }

    /// Advance one Verlet step. Attached particles are left untouched.
    pub fn integrate(&mut self, dt: f32) {
        if self.attached {
            return;
        }
        let temp = self.pos;
        self.pos = 2.0 * self.pos - self.prev_pos + self.acceleration * (dt * dt);
        self.prev_pos = temp;
    }

    /// Displacement over the last step.
    pub fn velocity_raw(&self) -> Vec3 {
        self.pos - self.prev_pos
    }

    pub fn velocity(&self, dt: f32) -> Vec3 {
        if dt.abs() < 1e-30 {
            return Vec3::ZERO;
        }
        self.velocity_raw() / dt
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Drive an attached particle to `pos`, keeping the old position as the
    /// previous one so the implicit velocity follows the anchor.
    pub fn move_to(&mut self, pos: Vec3) {
        if self.attached {
            self.prev_pos = self.pos;
            self.pos = pos;
        }
    }

    /// Place the particle at rest at `pos`.
    pub fn reset_pos(&mut self, pos: Vec3) {
        self.pos = pos;
        self.prev_pos = pos;
    }
}
