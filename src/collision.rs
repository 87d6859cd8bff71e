//! Collision detection and response for rope particles.
//!
//! Two channels run in a fixed order for every free particle:
//!
//! 1. **Static**: the particle's own movement over the step is probed against
//!    static geometry. A hit either stops the particle at the surface or, when
//!    the rope is taut, lets it slide along the surface.
//! 2. **Dynamic**: nearby movable bodies are tracked across steps. A body that
//!    moved is probed against from the particle, opposite to its
//!    displacement, so an approaching surface pushes the particle ahead of
//!    it. A body that did not move is handled like static geometry.
//!
//! A particle gets at most one correction per step. Particles whose trailing
//! segment is already overstretched are left alone so the constraint solver
//! can pull them back first.

use std::collections::hash_map::Entry;

use fnv::FnvHashMap;
use glam::Vec3;
use log::debug;

use crate::chain::ParticleChain;
use crate::config::RopeConfig;
use crate::observer::StepObserver;
use crate::query::{BodyId, CollisionQuery, LayerMask};

/// Which channel produced a correction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CollisionChannel {
    Static,
    Dynamic,
}

/// Collision tunables, resolved from a [`RopeConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionPolicy {
    pub static_channel: bool,
    pub dynamic_channel: bool,
    pub static_mask: LayerMask,
    pub dynamic_mask: LayerMask,
    pub clearance: f32,
    pub slide_stretch: f32,
    pub ignore_stretch: f32,
    pub dynamic_probe_length: f32,
    pub tracking_margin: f32,
    pub max_tracked_bodies: usize,
}

impl CollisionPolicy {
    pub fn from_config(config: &RopeConfig) -> Self {
        CollisionPolicy {
            static_channel: config.static_collision,
            dynamic_channel: config.dynamic_collision,
            static_mask: config.static_mask,
            dynamic_mask: config.dynamic_mask,
            clearance: config.collision_clearance,
            slide_stretch: config.slide_stretch,
            ignore_stretch: config.ignore_stretch,
            dynamic_probe_length: config.dynamic_probe_length,
            tracking_margin: config.tracking_margin,
            max_tracked_bodies: config.max_tracked_bodies,
        }
    }
}

/// Last two sightings of a movable body near the rope.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedBody {
    pub previous: Vec3,
    pub current: Vec3,
    stamp: u64,
}

impl TrackedBody {
    /// Movement of the body since the previous step.
    pub fn displacement(&self) -> Vec3 {
        self.current - self.previous
    }
}

/// Applies the collision policy to a chain once per step.
#[derive(Clone, Debug)]
pub struct CollisionResolver {
    policy: CollisionPolicy,
    tracked: FnvHashMap<BodyId, TrackedBody>,
    order: Vec<BodyId>,
    epoch: u64,
}

impl CollisionResolver {
    pub fn new(policy: CollisionPolicy) -> Self {
        CollisionResolver {
            policy,
            tracked: FnvHashMap::default(),
            order: Vec::new(),
            epoch: 0,
        }
    }

    pub fn policy(&self) -> &CollisionPolicy {
        &self.policy
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn tracked(&self, body: BodyId) -> Option<&TrackedBody> {
        self.tracked.get(&body)
    }

    pub fn clear_tracking(&mut self) {
        self.tracked.clear();
        self.order.clear();
    }

    /// Refresh the tracked-body table from a volume query around the chain.
    ///
    /// Bodies seen again keep their previous position; bodies not seen this
    /// step are evicted in one pass over the table.
    pub fn track_bodies(&mut self, chain: &ParticleChain, query: &dyn CollisionQuery, exclude: &[BodyId]) {
        self.epoch = self.epoch.wrapping_add(1);
        let epoch = self.epoch;

        let (min, max) = chain.bounds();
        let center = (min + max) * 0.5;
        let half_extents = (max - min) * 0.5 + Vec3::splat(self.policy.tracking_margin);

        let hits = query.overlap_box(
            center,
            half_extents,
            self.policy.dynamic_mask,
            self.policy.max_tracked_bodies,
        );
        for hit in hits.into_iter().filter(|h| !exclude.contains(&h.body)) {
            match self.tracked.entry(hit.body) {
                Entry::Occupied(entry) => {
                    let body = entry.into_mut();
                    body.previous = body.current;
                    body.current = hit.position;
                    body.stamp = epoch;
                }
                Entry::Vacant(entry) => {
                    entry.insert(TrackedBody {
                        previous: hit.position,
                        current: hit.position,
                        stamp: epoch,
                    });
                }
            }
        }

        let before = self.tracked.len();
        self.tracked.retain(|_, body| body.stamp == epoch);
        if self.tracked.len() < before {
            debug!("stopped tracking {} bodies", before - self.tracked.len());
        }

        self.order.clear();
        self.order.extend(self.tracked.keys().copied());
        self.order.sort_unstable();
    }

    /// Move penetrating particles back out of the world. Returns the number
    /// of corrected particles.
    ///
    /// With no query service, or one that is not ready, nothing happens.
    pub fn resolve<O: StepObserver>(
        &mut self,
        chain: &mut ParticleChain,
        query: Option<&dyn CollisionQuery>,
        exclude: &[BodyId],
        observer: &mut O,
    ) -> usize {
        let Some(query) = query.filter(|q| q.is_ready()) else {
            return 0;
        };
        if !self.policy.static_channel && !self.policy.dynamic_channel {
            return 0;
        }
        if self.policy.dynamic_channel {
            self.track_bodies(chain, query, exclude);
        }

        let rest_length = chain.rest_length();
        let mut corrections = 0;

        for i in 0..chain.len() {
            let particle = chain.particle(i);
            if particle.attached {
                continue;
            }
            let (prev, pos) = (particle.prev_pos, particle.pos);

            // Only the segment leading into this particle is inspected.
            let trailing = chain.trailing_stretch(i);
            if trailing.map_or(false, |s| s > self.policy.ignore_stretch * rest_length) {
                continue;
            }
            let slide = trailing.map_or(false, |s| s > self.policy.slide_stretch * rest_length);

            let resolved = self
                .probe_static(query, prev, pos, slide, exclude)
                .map(|target| (target, CollisionChannel::Static))
                .or_else(|| {
                    self.probe_dynamic(query, prev, pos, slide, exclude)
                        .map(|target| (target, CollisionChannel::Dynamic))
                });

            if let Some((target, channel)) = resolved {
                chain.particle_mut(i).pos = target;
                observer.on_collision(i, channel);
                corrections += 1;
            }
        }

        corrections
    }

    fn probe_static(
        &self,
        query: &dyn CollisionQuery,
        prev: Vec3,
        pos: Vec3,
        slide: bool,
        exclude: &[BodyId],
    ) -> Option<Vec3> {
        if !self.policy.static_channel {
            return None;
        }
        self.probe_movement(query, prev, pos, slide, self.policy.static_mask, exclude, None)
    }

    fn probe_dynamic(
        &self,
        query: &dyn CollisionQuery,
        prev: Vec3,
        pos: Vec3,
        slide: bool,
        exclude: &[BodyId],
    ) -> Option<Vec3> {
        if !self.policy.dynamic_channel {
            return None;
        }
        let clearance = self.policy.clearance;

        self.order.iter().find_map(|&id| {
            let body = &self.tracked[&id];
            match body.displacement().try_normalize() {
                Some(dir) => {
                    let hit = query
                        .raycast(prev, -dir * self.policy.dynamic_probe_length, self.policy.dynamic_mask, exclude)
                        .filter(|hit| hit.body == Some(id))?;
                    let depth = (pos - hit.point).dot(hit.normal);
                    (depth < clearance).then(|| pos + hit.normal * (clearance - depth))
                }
                None => self.probe_movement(query, prev, pos, slide, self.policy.dynamic_mask, exclude, Some(id)),
            }
        })
    }

    /// Probe along the particle's own movement and return where it should be.
    #[allow(clippy::too_many_arguments)]
    fn probe_movement(
        &self,
        query: &dyn CollisionQuery,
        prev: Vec3,
        pos: Vec3,
        slide: bool,
        mask: LayerMask,
        exclude: &[BodyId],
        only: Option<BodyId>,
    ) -> Option<Vec3> {
        let movement = pos - prev;
        let dir = movement.try_normalize()?;
        let clearance = self.policy.clearance;

        let hit = query.raycast(prev, movement + dir * clearance, mask, exclude)?;
        if only.is_some() && hit.body != only {
            return None;
        }

        let back = (hit.point - prev).try_normalize().unwrap_or(dir);
        let mut target = hit.point - back * clearance;
        if slide {
            let remainder = pos - target;
            target += remainder - hit.normal * remainder.dot(hit.normal);
        }
        Some(target)
    }
}
