//! Input handling.
//!
//! Wheel events arrive between frames and are queued; the frame loop applies
//! them in arrival order before autoplay runs.

use std::collections::VecDeque;

use vignette_core::progress::{ProgressSource, WheelOutcome};

/// A mouse-wheel event; positive `delta_y` scrolls forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub delta_y: f32,
}

/// What happened to the events applied in one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSummary {
    pub applied: usize,
    pub locked: usize,
    pub ignored: usize,
}

#[derive(Debug, Default)]
pub struct InputQueue {
    pending: VecDeque<WheelEvent>,
}

impl InputQueue {
    pub fn push(&mut self, event: WheelEvent) {
        self.pending.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains every queued event into `progress`.
    pub fn apply(&mut self, progress: &mut ProgressSource) -> InputSummary {
        let mut summary = InputSummary::default();
        for event in self.pending.drain(..) {
            match progress.apply_wheel(event.delta_y) {
                WheelOutcome::Applied => summary.applied += 1,
                WheelOutcome::Locked => summary.locked += 1,
                WheelOutcome::Ignored => summary.ignored += 1,
            }
        }
        summary
    }
}
