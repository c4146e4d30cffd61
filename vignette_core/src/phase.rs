//! Phase map.
//!
//! Names the bands of the timeline. Evaluators read thresholds from
//! [`PhaseThresholds`] directly; this enum exists for logging, events and
//! tests.

use serde::{Deserialize, Serialize};

use crate::config::TimelineConfig;
use crate::math::clamp_unit;

/// Named sub-range of progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Swing,
    Flight,
    GreenApproach,
    HoleIn,
    Firework,
    Shatter,
}

impl Phase {
    pub const ALL: [Phase; 7] = [
        Phase::Idle,
        Phase::Swing,
        Phase::Flight,
        Phase::GreenApproach,
        Phase::HoleIn,
        Phase::Firework,
        Phase::Shatter,
    ];

    /// Classifies a progress value.
    pub fn of(progress: f32, cfg: &TimelineConfig) -> Self {
        let p = clamp_unit(progress);
        let t = &cfg.phases;
        let ball_width = t.ball_end - t.ball_start;
        let flight_end = t.ball_start + cfg.ball.phase_ends[0] * ball_width;
        let hole_in_start = t.ball_start + cfg.ball.phase_ends[3] * ball_width;

        if p < t.swing_start {
            Phase::Idle
        } else if p < t.ball_start {
            Phase::Swing
        } else if p < flight_end {
            Phase::Flight
        } else if p < hole_in_start {
            Phase::GreenApproach
        } else if p < t.firework_start {
            Phase::HoleIn
        } else if p < t.shatter_start {
            Phase::Firework
        } else {
            Phase::Shatter
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Swing => "swing",
            Phase::Flight => "flight",
            Phase::GreenApproach => "green-approach",
            Phase::HoleIn => "hole-in",
            Phase::Firework => "firework",
            Phase::Shatter => "shatter",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_follow_threshold_order() {
        let cfg = TimelineConfig::default();
        assert_eq!(Phase::of(0.0, &cfg), Phase::Idle);
        assert_eq!(Phase::of(0.35, &cfg), Phase::Swing);
        assert_eq!(Phase::of(0.38, &cfg), Phase::Flight);
        assert_eq!(Phase::of(0.60, &cfg), Phase::GreenApproach);
        assert_eq!(Phase::of(0.74, &cfg), Phase::HoleIn);
        assert_eq!(Phase::of(0.75, &cfg), Phase::Firework);
        assert_eq!(Phase::of(0.89, &cfg), Phase::Shatter);
        assert_eq!(Phase::of(1.0, &cfg), Phase::Shatter);
    }

    #[test]
    fn sweep_never_goes_backwards() {
        let cfg = TimelineConfig::default();
        let mut last = 0;
        for i in 0..=1000 {
            let phase = Phase::of(i as f32 / 1000.0, &cfg);
            let idx = Phase::ALL.iter().position(|p| *p == phase).unwrap();
            assert!(idx >= last);
            last = idx;
        }
        assert_eq!(last, Phase::ALL.len() - 1);
    }
}
