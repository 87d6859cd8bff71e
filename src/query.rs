//! Interfaces to the world around a rope, and a simple world implementing them.
//!
//! The simulation only talks to collision geometry and external bodies
//! through [`CollisionQuery`] and [`BodyLayer`]. [`SceneQuery`] is a small
//! self-contained implementation (planes, boxes and movable spheres) used for
//! tests, benchmarks and demos.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Identity of an external body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u64);

/// Bit set of collision layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    pub const fn layer(index: u32) -> LayerMask {
        LayerMask(1 << index)
    }

    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// Result of a ray probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at hit point
    pub normal: Vec3,
    /// Distance from the probe origin
    pub distance: f32,
    /// Body that was hit, `None` for static geometry
    pub body: Option<BodyId>,
}

/// A body found by a volume query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OverlapHit {
    pub body: BodyId,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Ray and volume queries against the collision world.
pub trait CollisionQuery {
    /// Whether the service can answer queries yet. Unready services are
    /// treated as "no collision".
    fn is_ready(&self) -> bool {
        true
    }

    /// Cast a probe from `origin` along `direction`; the probe length is
    /// `direction.length()`. Returns the closest hit on `mask` not in `exclude`.
    fn raycast(&self, origin: Vec3, direction: Vec3, mask: LayerMask, exclude: &[BodyId]) -> Option<RayHit>;

    /// Movable bodies overlapping the box, at most `max_results`.
    fn overlap_box(&self, center: Vec3, half_extents: Vec3, mask: LayerMask, max_results: usize) -> Vec<OverlapHit>;
}

/// Something a force can be applied to.
pub trait ForceTarget {
    /// Apply `force` at `offset` from the body's center.
    fn apply_force(&mut self, force: Vec3, offset: Vec3);
}

/// Access to external bodies that ropes and joints are bound to.
pub trait BodyLayer {
    /// Current position, or `None` if the body no longer exists.
    fn body_position(&self, body: BodyId) -> Option<Vec3>;

    /// The force capability of `body`, if it has one. Static and kinematic
    /// bodies return `None`.
    fn force_target(&mut self, body: BodyId) -> Option<&mut dyn ForceTarget>;
}

/// Static collision geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StaticShape {
    /// One-sided plane; only probes travelling against `normal` hit it.
    Plane { point: Vec3, normal: Vec3 },
    /// Axis-aligned box.
    Box { min: Vec3, max: Vec3 },
}

#[derive(Clone, Debug)]
struct StaticCollider {
    shape: StaticShape,
    layer: LayerMask,
}

/// A movable sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneBody {
    pub id: BodyId,
    pub center: Vec3,
    pub radius: f32,
    pub velocity: Vec3,
    pub layer: LayerMask,
    /// Accepts forces when true.
    pub dynamic: bool,
    /// Force accumulated since the last [`SceneQuery::take_force`].
    pub force: Vec3,
    pub torque: Vec3,
}

impl ForceTarget for SceneBody {
    fn apply_force(&mut self, force: Vec3, offset: Vec3) {
        self.force += force;
        self.torque += offset.cross(force);
    }
}

/// A small collision world: static planes and boxes, movable spheres.
#[derive(Clone, Debug)]
pub struct SceneQuery {
    statics: Vec<StaticCollider>,
    bodies: Vec<SceneBody>,
    next_id: u64,
    ready: bool,
}

impl SceneQuery {
    pub fn new() -> Self {
        SceneQuery {
            statics: Vec::new(),
            bodies: Vec::new(),
            next_id: 1,
            ready: true,
        }
    }

    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    /// Add a one-sided plane. `normal` is normalized here.
    pub fn add_plane(&mut self, point: Vec3, normal: Vec3, layer: LayerMask) {
        self.statics.push(StaticCollider {
            shape: StaticShape::Plane { point, normal: normal.normalize_or_zero() },
            layer,
        });
    }

    pub fn add_box(&mut self, min: Vec3, max: Vec3, layer: LayerMask) {
        self.statics.push(StaticCollider {
            shape: StaticShape::Box { min: min.min(max), max: min.max(max) },
            layer,
        });
    }

    /// Add a sphere body and return its id.
    pub fn add_body(&mut self, center: Vec3, radius: f32, layer: LayerMask, dynamic: bool) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        self.bodies.push(SceneBody {
            id,
            center,
            radius,
            velocity: Vec3::ZERO,
            layer,
            dynamic,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        });
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<SceneBody> {
        let index = self.bodies.iter().position(|b| b.id == id)?;
        Some(self.bodies.remove(index))
    }

    /// Teleport a body, recording the velocity implied over `dt`.
    pub fn move_body(&mut self, id: BodyId, center: Vec3, dt: f32) {
        if let Some(body) = self.body_mut(id) {
            if dt > 0.0 {
                body.velocity = (center - body.center) / dt;
            }
            body.center = center;
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&SceneBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut SceneBody> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    /// Return and clear the force accumulated on a body.
    pub fn take_force(&mut self, id: BodyId) -> Vec3 {
        self.body_mut(id)
            .map(|b| {
                b.torque = Vec3::ZERO;
                std::mem::take(&mut b.force)
            })
            .unwrap_or(Vec3::ZERO)
    }
}

impl Default for SceneQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionQuery for SceneQuery {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn raycast(&self, origin: Vec3, direction: Vec3, mask: LayerMask, exclude: &[BodyId]) -> Option<RayHit> {
        let max_t = direction.length();
        let dir = direction.try_normalize()?;

        let statics = self
            .statics
            .iter()
            .filter(|s| s.layer.intersects(mask))
            .filter_map(|s| match s.shape {
                StaticShape::Plane { point, normal } => ray_plane(origin, dir, max_t, point, normal),
                StaticShape::Box { min, max } => ray_box(origin, dir, max_t, min, max),
            });

        let bodies = self
            .bodies
            .iter()
            .filter(|b| b.layer.intersects(mask) && !exclude.contains(&b.id))
            .filter_map(|b| {
                ray_sphere(origin, dir, max_t, b.center, b.radius).map(|hit| RayHit {
                    body: Some(b.id),
                    ..hit
                })
            });

        statics
            .chain(bodies)
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn overlap_box(&self, center: Vec3, half_extents: Vec3, mask: LayerMask, max_results: usize) -> Vec<OverlapHit> {
        let min = center - half_extents;
        let max = center + half_extents;
        let mut hits: Vec<OverlapHit> = self
            .bodies
            .iter()
            .filter(|b| b.layer.intersects(mask))
            .filter(|b| b.center.clamp(min, max).distance_squared(b.center) <= b.radius * b.radius)
            .map(|b| OverlapHit {
                body: b.id,
                position: b.center,
                velocity: b.velocity,
            })
            .collect();
        hits.sort_by_key(|h| h.body);
        hits.truncate(max_results);
        hits
    }
}

impl BodyLayer for SceneQuery {
    fn body_position(&self, body: BodyId) -> Option<Vec3> {
        self.body(body).map(|b| b.center)
    }

    fn force_target(&mut self, body: BodyId) -> Option<&mut dyn ForceTarget> {
        self.bodies
            .iter_mut()
            .find(|b| b.id == body && b.dynamic)
            .map(|b| b as &mut dyn ForceTarget)
    }
}

fn ray_plane(origin: Vec3, dir: Vec3, max_t: f32, point: Vec3, normal: Vec3) -> Option<RayHit> {
    let denom = dir.dot(normal);
    if denom >= -1e-8 {
        return None;
    }
    let t = (point - origin).dot(normal) / denom;
    if !(0.0..=max_t).contains(&t) {
        return None;
    }
    Some(RayHit { point: origin + dir * t, normal, distance: t, body: None })
}

fn ray_box(origin: Vec3, dir: Vec3, max_t: f32, min: Vec3, max: Vec3) -> Option<RayHit> {
    let mut t_min = f32::NEG_INFINITY;
    let mut t_max = f32::INFINITY;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let (o, d) = (origin[axis], dir[axis]);
        if d.abs() < 1e-12 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let inv = 1.0 / d;
        let (mut t0, mut t1) = ((min[axis] - o) * inv, (max[axis] - o) * inv);
        let mut face = Vec3::ZERO;
        face[axis] = -d.signum();
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > t_min {
            t_min = t0;
            normal = face;
        }
        t_max = t_max.min(t1);
        if t_min > t_max {
            return None;
        }
    }

    // Probes starting inside a box do not report it.
    if t_min < 0.0 || t_min > max_t {
        return None;
    }
    Some(RayHit { point: origin + dir * t_min, normal, distance: t_min, body: None })
}

fn ray_sphere(origin: Vec3, dir: Vec3, max_t: f32, center: Vec3, radius: f32) -> Option<RayHit> {
    let oc = origin - center;
    let b = oc.dot(dir);
    let c = oc.length_squared() - radius * radius;
    if c < 0.0 {
        return None;
    }
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let t = -b - discriminant.sqrt();
    if !(0.0..=max_t).contains(&t) {
        return None;
    }
    let point = origin + dir * t;
    Some(RayHit {
        point,
        normal: (point - center).normalize_or_zero(),
        distance: t,
        body: None,
    })
}
