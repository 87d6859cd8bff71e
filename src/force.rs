//! Per-particle acceleration: gravity, turbulent wind and drag.

use glam::Vec3;

use crate::config::RopeConfig;
use crate::particle::Particle;

/// A scalar field sampled to drive wind gusts.
pub trait TurbulenceField {
    fn sample(&self, point: Vec3) -> f32;
}

impl<F: Fn(Vec3) -> f32> TurbulenceField for F {
    fn sample(&self, point: Vec3) -> f32 {
        self(point)
    }
}

/// Lattice cells after which [`ValueNoise`] repeats along each axis.
pub const NOISE_PERIOD: i32 = 256;

/// Seeded lattice value noise in `[-1, 1]` with smooth trilinear interpolation.
///
/// The field tiles every [`NOISE_PERIOD`] cells, so a scroll offset wrapped
/// at that period samples it without a seam.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueNoise {
    seed: u32,
    frequency: f32,
}

impl ValueNoise {
    pub fn new(seed: u64, frequency: f32) -> Self {
        ValueNoise {
            seed: (seed ^ (seed >> 32)) as u32,
            frequency,
        }
    }

    fn lattice(&self, x: i32, y: i32, z: i32) -> f32 {
        let (x, y, z) = (
            x.rem_euclid(NOISE_PERIOD),
            y.rem_euclid(NOISE_PERIOD),
            z.rem_euclid(NOISE_PERIOD),
        );
        let h = mix(
            (x as u32).wrapping_mul(0x8da6_b343)
                ^ (y as u32).wrapping_mul(0xd816_3841)
                ^ (z as u32).wrapping_mul(0xcb1a_b31f)
                ^ self.seed,
        );
        (h as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl TurbulenceField for ValueNoise {
    fn sample(&self, point: Vec3) -> f32 {
        let p = point * self.frequency;
        let base = p.floor();
        let f = p - base;
        let u = f * f * (Vec3::splat(3.0) - 2.0 * f);
        let (x, y, z) = (base.x as i32, base.y as i32, base.z as i32);

        let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
        let x00 = lerp(self.lattice(x, y, z), self.lattice(x + 1, y, z), u.x);
        let x10 = lerp(self.lattice(x, y + 1, z), self.lattice(x + 1, y + 1, z), u.x);
        let x01 = lerp(self.lattice(x, y, z + 1), self.lattice(x + 1, y, z + 1), u.x);
        let x11 = lerp(self.lattice(x, y + 1, z + 1), self.lattice(x + 1, y + 1, z + 1), u.x);
        lerp(lerp(x00, x10, u.y), lerp(x01, x11, u.y), u.z)
    }
}

fn mix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x7feb_352d);
    h ^= h >> 15;
    h = h.wrapping_mul(0x846c_a68b);
    h ^= h >> 16;
    h
}

/// Wind parameters resolved from a config.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wind {
    pub direction: Vec3,
    pub noise_min: f32,
    pub noise_max: f32,
    pub speed: f32,
    /// Distance after which the scroll offset wraps.
    pub scroll_period: f64,
}

impl Wind {
    /// Scroll offset at `elapsed` seconds, wrapped to `[0, scroll_period)`.
    pub fn scroll(&self, elapsed: f64) -> f32 {
        (elapsed * self.speed as f64).rem_euclid(self.scroll_period) as f32
    }
}

/// Scroll period matching one tile of the built-in noise at `frequency`.
fn scroll_period(frequency: f32) -> f64 {
    if frequency > 0.0 {
        NOISE_PERIOD as f64 / frequency as f64
    } else {
        NOISE_PERIOD as f64
    }
}

/// Computes the acceleration of every particle for one step.
///
/// Forces are accumulated for all particles, attached or not; attachment only
/// stops integration. Positions are never touched here.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForceAccumulator {
    pub gravity: Option<Vec3>,
    pub wind: Option<Wind>,
    pub damping: Option<f32>,
}

impl ForceAccumulator {
    pub fn from_config(config: &RopeConfig) -> Self {
        ForceAccumulator {
            gravity: config
                .gravity_enabled
                .then(|| config.gravity * config.gravity_scale),
            wind: config.wind_enabled.then(|| Wind {
                direction: config.wind_direction,
                noise_min: config.wind_noise_min,
                noise_max: config.wind_noise_max,
                speed: config.wind_speed,
                scroll_period: scroll_period(config.wind_frequency),
            }),
            damping: config.damping_enabled.then_some(config.damping),
        }
    }

    /// Overwrite `acceleration` of every particle.
    ///
    /// `elapsed` is the simulated time so far; it scrolls the turbulence field.
    /// Wind is skipped when no field is available.
    pub fn apply(&self, particles: &mut [Particle], field: Option<&dyn TurbulenceField>, elapsed: f64) {
        for p in particles.iter_mut() {
            p.acceleration = Vec3::ZERO;

            if let Some(gravity) = self.gravity {
                p.acceleration += gravity;
            }

            if let (Some(wind), Some(field)) = (self.wind, field) {
                let offset = Vec3::splat(wind.scroll(elapsed));
                let gust = field.sample(p.pos + offset).clamp(wind.noise_min, wind.noise_max);
                p.acceleration += wind.direction * gust;
            }

            // First-order drag against the last step's displacement.
            if let Some(damping) = self.damping {
                p.acceleration -= damping * (p.pos - p.prev_pos);
            }
        }
    }
}
