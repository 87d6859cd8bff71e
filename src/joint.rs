//! Coupling between a rope and the bodies around it.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::query::{BodyId, BodyLayer};

/// Where one end of a rope is held.
///
/// A custom `location` wins over the body's position. An anchor whose body
/// has disappeared and that has no location resolves to nothing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub body: Option<BodyId>,
    pub location: Option<Vec3>,
    /// Whether the rope end is pinned to the anchor. Only meaningful for the
    /// end anchor; the start of a rope is always pinned.
    pub attached: bool,
}

impl Anchor {
    pub fn body(body: BodyId) -> Self {
        Anchor { body: Some(body), location: None, attached: true }
    }

    pub fn point(location: Vec3) -> Self {
        Anchor { body: None, location: Some(location), attached: true }
    }

    pub fn with_location(mut self, location: Vec3) -> Self {
        self.location = Some(location);
        self
    }

    /// Keep the binding but let the end dangle.
    pub fn detached(mut self) -> Self {
        self.attached = false;
        self
    }

    pub fn resolve(&self, bodies: Option<&dyn BodyLayer>) -> Option<Vec3> {
        self.location
            .or_else(|| self.body.and_then(|body| bodies?.body_position(body)))
    }
}

/// Start and end anchors of one rope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnchorBinding {
    pub start: Option<Anchor>,
    pub end: Option<Anchor>,
}

impl AnchorBinding {
    pub fn new(start: Option<Anchor>, end: Option<Anchor>) -> Self {
        AnchorBinding { start, end }
    }

    /// Rope held at `start` only; the other end hangs free.
    pub fn hanging(start: Anchor) -> Self {
        AnchorBinding { start: Some(start), end: None }
    }

    pub fn between(start: Anchor, end: Anchor) -> Self {
        AnchorBinding { start: Some(start), end: Some(end) }
    }

    /// Position of the rope's first particle, `fallback` when unanchored.
    pub fn resolve_start(&self, bodies: Option<&dyn BodyLayer>, fallback: Vec3) -> Vec3 {
        self.start
            .and_then(|anchor| anchor.resolve(bodies))
            .unwrap_or(fallback)
    }

    /// Position the last particle is pinned to, if it is pinned at all.
    pub fn resolve_end(&self, bodies: Option<&dyn BodyLayer>) -> Option<Vec3> {
        self.end
            .filter(|anchor| anchor.attached)
            .and_then(|anchor| anchor.resolve(bodies))
    }

    /// Bodies the rope is bound to; collision probes ignore them.
    pub fn bodies(&self) -> Vec<BodyId> {
        [self.start, self.end]
            .into_iter()
            .flatten()
            .filter_map(|anchor| anchor.body)
            .collect()
    }
}

/// Pulls two bodies together once they drift further apart than
/// `max_distance`.
///
/// The pull grows from zero along `t^ease_power`, where `t` is the excess
/// separation over `ease_range` clamped to 1, and tops out at `max_force`.
/// A zero `max_distance` disables the joint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForceJoint {
    pub body_a: BodyId,
    pub body_b: BodyId,
    pub offset_a: Vec3,
    pub offset_b: Vec3,
    pub max_distance: f32,
    pub max_force: f32,
    pub ease_range: f32,
    pub ease_power: f32,
    /// Apply the force at the offsets (producing torque) instead of the centers.
    pub use_offsets: bool,
}

impl ForceJoint {
    pub fn new(body_a: BodyId, body_b: BodyId, max_distance: f32, max_force: f32) -> Self {
        ForceJoint {
            body_a,
            body_b,
            offset_a: Vec3::ZERO,
            offset_b: Vec3::ZERO,
            max_distance,
            max_force,
            ease_range: 1.0,
            ease_power: 2.0,
            use_offsets: false,
        }
    }

    /// Bind points away from the body centers; forces act at those points.
    pub fn with_offsets(mut self, offset_a: Vec3, offset_b: Vec3) -> Self {
        self.offset_a = offset_a;
        self.offset_b = offset_b;
        self.use_offsets = true;
        self
    }

    pub fn with_ease(mut self, range: f32, power: f32) -> Self {
        self.ease_range = range;
        self.ease_power = power;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.max_distance > 0.0
    }

    /// Pull strength at a given separation.
    pub fn force_magnitude(&self, separation: f32) -> f32 {
        if !self.is_enabled() {
            return 0.0;
        }
        let excess = separation - self.max_distance;
        if excess <= 0.0 {
            return 0.0;
        }
        let t = if self.ease_range > 0.0 {
            (excess / self.ease_range).min(1.0)
        } else {
            1.0
        };
        self.max_force * t.powf(self.ease_power)
    }

    /// Apply one physics step worth of pull. Returns the applied magnitude.
    ///
    /// Bodies without a force capability are skipped; a missing body disables
    /// the joint for this step.
    pub fn apply(&self, bodies: &mut dyn BodyLayer) -> f32 {
        if !self.is_enabled() {
            return 0.0;
        }
        let (Some(a), Some(b)) = (bodies.body_position(self.body_a), bodies.body_position(self.body_b)) else {
            return 0.0;
        };

        let delta = (b + self.offset_b) - (a + self.offset_a);
        let separation = delta.length();
        let magnitude = self.force_magnitude(separation);
        if magnitude <= 0.0 {
            return 0.0;
        }

        let force = delta / separation * magnitude;
        let (lever_a, lever_b) = if self.use_offsets {
            (self.offset_a, self.offset_b)
        } else {
            (Vec3::ZERO, Vec3::ZERO)
        };
        if let Some(target) = bodies.force_target(self.body_a) {
            target.apply_force(force, lever_a);
        }
        if let Some(target) = bodies.force_target(self.body_b) {
            target.apply_force(-force, lever_b);
        }
        magnitude
    }
}
