//! Per-frame gating of rope simulation steps.

use glam::Vec3;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::config::RopeConfig;

/// Tolerance used when comparing accumulated frame time to the step interval.
const RATE_EPSILON: f32 = 1e-6;

/// When a rope is allowed to simulate.
///
/// Authoring-tool modes have no runtime meaning and load as their runtime
/// equivalents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationMode {
    Disabled,
    #[default]
    #[serde(alias = "RunWhenEditingTool")]
    AlwaysRun,
    #[serde(alias = "RunWhenVisibleOrSelected")]
    RunWhenVisible,
}

/// Tells whether a bounding box is currently on screen.
pub trait VisibilityOracle {
    fn is_visible(&self, min: Vec3, max: Vec3) -> bool;
}

impl<F: Fn(Vec3, Vec3) -> bool> VisibilityOracle for F {
    fn is_visible(&self, min: Vec3, max: Vec3) -> bool {
        self(min, max)
    }
}

/// Why a frame did not step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Disabled,
    Hidden,
    Throttled,
    Stalled,
    /// Zero or negative frame time.
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickDecision {
    Step { dt: f32 },
    Skip(SkipReason),
}

impl TickDecision {
    pub fn is_step(&self) -> bool {
        matches!(self, TickDecision::Step { .. })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub steps: u64,
    pub forced: u64,
    pub disabled: u64,
    pub hidden: u64,
    pub throttled: u64,
    pub stalled: u64,
    pub idle: u64,
}

/// Decides, frame by frame, whether a rope steps and with which timestep.
#[derive(Clone, Debug)]
pub struct Scheduler {
    mode: SimulationMode,
    visibility_tracking: bool,
    target_rate: f32,
    stall_threshold: f32,
    forced_remaining: u32,
    accumulated: f32,
    stats: SchedulerStats,
}

impl Scheduler {
    pub fn from_config(config: &RopeConfig) -> Self {
        Scheduler {
            mode: config.mode,
            visibility_tracking: config.visibility_tracking,
            target_rate: config.target_rate,
            stall_threshold: config.stall_threshold,
            forced_remaining: config.forced_frames,
            accumulated: 0.0,
            stats: SchedulerStats::default(),
        }
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn forced_remaining(&self) -> u32 {
        self.forced_remaining
    }

    /// Force the next `frames` frames to step unconditionally.
    pub fn force_frames(&mut self, frames: u32) {
        self.forced_remaining = frames;
        self.accumulated = 0.0;
    }

    /// Whether visibility should be asked at all this frame.
    pub fn needs_visibility(&self) -> bool {
        self.mode == SimulationMode::RunWhenVisible && self.visibility_tracking
    }

    /// Decide what to do with a frame that took `frame_dt` seconds.
    ///
    /// `visible` is ignored unless the mode is `RunWhenVisible` with
    /// visibility tracking on.
    pub fn decide(&mut self, frame_dt: f32, visible: bool) -> TickDecision {
        let decision = self.decide_inner(frame_dt, visible);
        match decision {
            TickDecision::Step { .. } => self.stats.steps += 1,
            TickDecision::Skip(SkipReason::Disabled) => self.stats.disabled += 1,
            TickDecision::Skip(SkipReason::Hidden) => self.stats.hidden += 1,
            TickDecision::Skip(SkipReason::Throttled) => self.stats.throttled += 1,
            TickDecision::Skip(SkipReason::Stalled) => self.stats.stalled += 1,
            TickDecision::Skip(SkipReason::Idle) => self.stats.idle += 1,
        }
        decision
    }

    fn decide_inner(&mut self, frame_dt: f32, visible: bool) -> TickDecision {
        if frame_dt.is_nan() || frame_dt <= 0.0 {
            return TickDecision::Skip(SkipReason::Idle);
        }
        if frame_dt > self.stall_threshold {
            debug!("skipping stalled frame of {:.3}s", frame_dt);
            self.accumulated = 0.0;
            return TickDecision::Skip(SkipReason::Stalled);
        }

        if self.forced_remaining > 0 {
            self.forced_remaining -= 1;
            self.stats.forced += 1;
            return TickDecision::Step { dt: frame_dt };
        }

        match self.mode {
            SimulationMode::Disabled => return TickDecision::Skip(SkipReason::Disabled),
            SimulationMode::RunWhenVisible if self.visibility_tracking && !visible => {
                return TickDecision::Skip(SkipReason::Hidden);
            }
            _ => {}
        }

        if self.target_rate <= 0.0 {
            return TickDecision::Step { dt: frame_dt };
        }

        let interval = 1.0 / self.target_rate;
        // Frames already slower than the target rate run unthrottled.
        if frame_dt + RATE_EPSILON >= interval {
            self.accumulated = 0.0;
            return TickDecision::Step { dt: frame_dt };
        }

        self.accumulated += frame_dt;
        if self.accumulated + RATE_EPSILON < interval {
            trace!("throttled, {:.4}s of {:.4}s accumulated", self.accumulated, interval);
            return TickDecision::Skip(SkipReason::Throttled);
        }
        // One step per frame at most; the remainder carries into the next interval.
        self.accumulated = (self.accumulated - interval).clamp(0.0, interval);
        TickDecision::Step { dt: interval }
    }
}
