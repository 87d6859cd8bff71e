//! Step observer trait for monitoring rope simulation progress.

use crate::collision::CollisionChannel;

/// Trait for observing rope simulation steps.
///
/// Implement this trait to monitor solver progress (e.g., for debugging,
/// visualization, or performance profiling). All methods have default
/// no-op implementations.
pub trait StepObserver {
    /// Called after accelerations have been recomputed.
    fn on_forces(&mut self) {}

    /// Called after all particles have been integrated (Verlet step).
    fn on_integrate(&mut self) {}

    /// Called after each constraint iteration.
    fn on_constraint_iteration(&mut self, _iteration: usize) {}

    /// Called when a particle was moved out of a surface.
    fn on_collision(&mut self, _particle: usize, _channel: CollisionChannel) {}

    /// Called when a simulation step is fully complete.
    fn on_step_complete(&mut self) {}
}

/// A no-op observer that does nothing. Use as default when no observation needed.
pub struct NoOpStepObserver;

impl StepObserver for NoOpStepObserver {}

/// Counts what happened during the observed steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepCounter {
    pub steps: usize,
    pub constraint_iterations: usize,
    pub static_hits: usize,
    pub dynamic_hits: usize,
    /// Particles corrected, in the order they were reported.
    pub collided: Vec<usize>,
}

impl StepCounter {
    pub fn collisions(&self) -> usize {
        self.static_hits + self.dynamic_hits
    }
}

impl StepObserver for StepCounter {
    fn on_constraint_iteration(&mut self, _iteration: usize) {
        self.constraint_iterations += 1;
    }

    fn on_collision(&mut self, particle: usize, channel: CollisionChannel) {
        match channel {
            CollisionChannel::Static => self.static_hits += 1,
            CollisionChannel::Dynamic => self.dynamic_hits += 1,
        }
        self.collided.push(particle);
    }

    fn on_step_complete(&mut self) {
        self.steps += 1;
    }
}
