//! Progress source.
//!
//! The single writer of the timeline scalar. Wheel input and autoplay both
//! mutate the same value; everything else reads it.

use tracing::debug;

use crate::config::ScrollConfig;
use crate::math::clamp_unit;

/// Outcome of a wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelOutcome {
    Applied,
    /// Forward input while the autoplay band is locked.
    Locked,
    /// Non-finite delta; progress is untouched.
    Ignored,
}

/// Owned progress state, always inside [0,1].
#[derive(Debug, Clone)]
pub struct ProgressSource {
    value: f32,
    cfg: ScrollConfig,
}

impl ProgressSource {
    pub fn new(cfg: ScrollConfig) -> Self {
        Self { value: 0.0, cfg }
    }

    pub fn progress(&self) -> f32 {
        self.value
    }

    /// Sets progress directly, clamped.
    pub fn set_progress(&mut self, value: f32) {
        self.value = clamp_unit(value);
    }

    /// Applies a wheel `deltaY` (positive scrolls forward).
    ///
    /// Forward input is rejected once progress reaches the lock threshold;
    /// backward input is always accepted.
    pub fn apply_wheel(&mut self, delta_y: f32) -> WheelOutcome {
        if !delta_y.is_finite() {
            debug!(progress = self.value, delta_y, "Non-finite wheel delta ignored");
            return WheelOutcome::Ignored;
        }
        if self.value >= self.cfg.forward_lock && delta_y > 0.0 {
            debug!(progress = self.value, delta_y, "Forward scroll locked");
            return WheelOutcome::Locked;
        }
        self.set_progress(self.value + delta_y * self.cfg.wheel_scale);
        WheelOutcome::Applied
    }

    /// Advances one autoplay frame. Returns true if progress moved.
    pub fn tick_autoplay(&mut self) -> bool {
        if self.value >= self.cfg.autoplay_start && self.value < 1.0 {
            self.value = (self.value + self.cfg.autoplay_step).min(1.0);
            true
        } else {
            false
        }
    }

    pub fn is_autoplaying(&self) -> bool {
        self.value >= self.cfg.autoplay_start && self.value < 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_at(p: f32) -> ProgressSource {
        let mut s = ProgressSource::new(ScrollConfig::default());
        s.set_progress(p);
        s
    }

    #[test]
    fn wheel_clamps_at_both_ends() {
        let mut s = source_at(0.01);
        s.apply_wheel(-10_000.0);
        assert_eq!(s.progress(), 0.0);

        let mut s = source_at(0.7);
        s.apply_wheel(100_000.0);
        assert_eq!(s.progress(), 1.0);
    }

    #[test]
    fn forward_scroll_locked_in_autoplay_band() {
        let mut s = source_at(0.8);
        assert_eq!(s.apply_wheel(120.0), WheelOutcome::Locked);
        assert_eq!(s.progress(), 0.8);

        assert_eq!(s.apply_wheel(-120.0), WheelOutcome::Applied);
        assert!(s.progress() < 0.8);
    }

    #[test]
    fn non_finite_wheel_delta_is_ignored() {
        let mut s = source_at(0.8);
        assert_eq!(s.apply_wheel(f32::NAN), WheelOutcome::Ignored);
        assert_eq!(s.progress(), 0.8);
        assert_eq!(s.apply_wheel(f32::NEG_INFINITY), WheelOutcome::Ignored);
        assert_eq!(s.apply_wheel(f32::INFINITY), WheelOutcome::Ignored);
        assert_eq!(s.progress(), 0.8);
    }

    #[test]
    fn wheel_scale_maps_delta() {
        let mut s = source_at(0.0);
        s.apply_wheel(100.0);
        assert!((s.progress() - 0.015).abs() < 1e-6);
    }

    #[test]
    fn autoplay_idle_below_band() {
        let mut s = source_at(0.5);
        assert!(!s.tick_autoplay());
        assert_eq!(s.progress(), 0.5);
    }

    #[test]
    fn autoplay_is_monotonic_and_stops_at_one() {
        let mut s = source_at(0.76);
        let mut last = s.progress();
        for _ in 0..2_000 {
            s.tick_autoplay();
            assert!(s.progress() >= last);
            assert!(s.progress() <= 1.0);
            last = s.progress();
        }
        assert_eq!(s.progress(), 1.0);
        assert!(!s.tick_autoplay());
    }

    #[test]
    fn set_progress_clamps() {
        let mut s = source_at(2.0);
        assert_eq!(s.progress(), 1.0);
        s.set_progress(-1.0);
        assert_eq!(s.progress(), 0.0);
    }
}
