//! Ball trajectory.
//!
//! The ball path is an ordered list of [`TrajectorySegment`]s tiling the
//! ball's local time `[0,1]`. Each segment walks X/Z through its waypoints in
//! equal sub-steps and builds Y from a linear base plus an arc term.
//! Positions are computed in tee-local space and offset by the configured
//! origin.

use std::f32::consts::PI;

use crate::config::{BallConfig, PhaseThresholds};
use crate::easing::{band_fraction, hump, Easing};
use crate::math::{clamp_unit, lerp, Vec3};

/// Vertical shape of a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arc {
    /// Main flight: half-sine lift plus an eased secondary term.
    Flight { height: f32 },
    /// Bounce: half-sine lift of the given height.
    Hop { height: f32 },
    /// X/Z frozen at the first waypoint, Y eased toward the last.
    Drop { easing: Easing },
}

/// One piece of the ball path, in ball-local time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectorySegment {
    /// At least two waypoints; first and last are the segment endpoints.
    pub waypoints: Vec<Vec3>,
    pub t_start: f32,
    pub t_end: f32,
    pub arc: Arc,
}

impl TrajectorySegment {
    fn start(&self) -> Vec3 {
        self.waypoints[0]
    }

    fn end(&self) -> Vec3 {
        self.waypoints[self.waypoints.len() - 1]
    }

    /// Samples the segment at segment-local `t ∈ [0,1]`.
    pub fn sample(&self, t: f32) -> Vec3 {
        let t = clamp_unit(t);
        let start = self.start();
        let end = self.end();

        if let Arc::Drop { easing } = self.arc {
            return Vec3::new(start.x, lerp(start.y, end.y, easing.apply(t)), start.z);
        }

        let (x, z) = walk_xz(&self.waypoints, t);
        let base_y = lerp(start.y, end.y, t);
        let lift = match self.arc {
            Arc::Flight { height } => flight_lift(t, height),
            Arc::Hop { height } => hump(t) * height,
            Arc::Drop { .. } => 0.0,
        };
        Vec3::new(x, base_y + lift, z)
    }
}

/// Piecewise-linear X/Z walk through waypoints in equal sub-steps.
fn walk_xz(points: &[Vec3], t: f32) -> (f32, f32) {
    let steps = points.len() - 1;
    let scaled = t * steps as f32;
    let idx = (scaled.floor() as usize).min(steps - 1);
    let local = scaled - idx as f32;
    let (a, b) = (points[idx], points[idx + 1]);
    (lerp(a.x, b.x, local), lerp(a.z, b.z, local))
}

/// Lift of the main flight: 70% half-sine plus 30% of an eased rise that is
/// tapered to zero over the second half.
fn flight_lift(t: f32, height: f32) -> f32 {
    let eased = Easing::QuadInOut.apply(t);
    let taper = if t < 0.5 { 1.0 } else { 1.0 - (t - 0.5) * 2.0 };
    (PI * t).sin() * height * 0.7 + eased * height * taper * 0.3
}

/// Evaluates the ball position for any progress.
#[derive(Debug, Clone)]
pub struct BallTrajectory {
    origin: Vec3,
    tee: Vec3,
    hole: Vec3,
    start: f32,
    end: f32,
    segments: Vec<TrajectorySegment>,
}

impl BallTrajectory {
    pub fn new(cfg: &BallConfig, phases: &PhaseThresholds) -> Self {
        let [f1, f2, f3, f4] = cfg.phase_ends;
        let [w1, w2, w3] = cfg.flight_waypoints;
        let [h1, h2, h3] = cfg.bounce_heights;
        let segments = vec![
            TrajectorySegment {
                waypoints: vec![cfg.tee, w1, w2, w3, cfg.landing],
                t_start: 0.0,
                t_end: f1,
                arc: Arc::Flight {
                    height: cfg.flight_height,
                },
            },
            TrajectorySegment {
                waypoints: vec![cfg.landing, cfg.bounce1_mid, cfg.bounce1],
                t_start: f1,
                t_end: f2,
                arc: Arc::Hop { height: h1 },
            },
            TrajectorySegment {
                waypoints: vec![cfg.bounce1, cfg.bounce2_mid, cfg.bounce2],
                t_start: f2,
                t_end: f3,
                arc: Arc::Hop { height: h2 },
            },
            TrajectorySegment {
                waypoints: vec![cfg.bounce2, cfg.bounce3],
                t_start: f3,
                t_end: f4,
                arc: Arc::Hop { height: h3 },
            },
            TrajectorySegment {
                waypoints: vec![cfg.bounce3, cfg.hole],
                t_start: f4,
                t_end: 1.0,
                arc: Arc::Drop {
                    easing: Easing::QuadOut,
                },
            },
        ];

        Self {
            origin: cfg.origin,
            tee: cfg.tee,
            hole: cfg.hole,
            start: phases.ball_start,
            end: phases.ball_end,
            segments,
        }
    }

    pub fn segments(&self) -> &[TrajectorySegment] {
        &self.segments
    }

    /// Tee position in world space.
    pub fn tee(&self) -> Vec3 {
        self.origin + self.tee
    }

    /// Resting position in the hole, world space.
    pub fn hole(&self) -> Vec3 {
        self.origin + self.hole
    }

    /// World-space ball position for a global progress value.
    pub fn position(&self, progress: f32) -> Vec3 {
        let p = clamp_unit(progress);
        if p <= self.start {
            return self.tee();
        }
        if p >= self.end {
            return self.hole();
        }
        self.origin + self.sample_local(band_fraction(p, self.start, self.end))
    }

    /// Tee-local position at ball-local time `t`.
    pub fn sample_local(&self, t: f32) -> Vec3 {
        let t = clamp_unit(t);
        let segment = self
            .segments
            .iter()
            .find(|s| t <= s.t_end)
            .or_else(|| self.segments.last());
        match segment {
            Some(s) => s.sample(band_fraction(t, s.t_start, s.t_end)),
            None => self.tee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;

    fn trajectory() -> (BallTrajectory, TimelineConfig) {
        let cfg = TimelineConfig::default();
        (BallTrajectory::new(&cfg.ball, &cfg.phases), cfg)
    }

    #[test]
    fn segments_tile_local_time() {
        let (ball, _) = trajectory();
        let segs = ball.segments();
        assert_eq!(segs.first().unwrap().t_start, 0.0);
        assert_eq!(segs.last().unwrap().t_end, 1.0);
        for pair in segs.windows(2) {
            assert_eq!(pair[0].t_end, pair[1].t_start);
            assert_eq!(pair[0].end(), pair[1].start());
        }
    }

    #[test]
    fn rests_on_tee_then_in_hole() {
        let (ball, _) = trajectory();
        assert!(ball.position(0.0).distance(Vec3::new(-0.2, 4.05, 40.0)) < 1e-5);
        assert_eq!(ball.position(0.38), ball.tee());
        assert_eq!(ball.position(0.75), ball.hole());
        assert_eq!(ball.position(1.0), ball.hole());
    }

    #[test]
    fn flight_rises_above_baseline() {
        let (ball, cfg) = trajectory();
        let pos = ball.position(0.5);
        let landing = cfg.ball.origin + cfg.ball.landing;
        assert!(pos.y > ball.tee().y);
        assert!(pos.y > landing.y);
    }

    #[test]
    fn bounce_heights_decrease() {
        let (ball, _) = trajectory();
        let peaks: Vec<f32> = ball.segments()[1..4]
            .iter()
            .map(|s| s.sample(0.5).y - lerp(s.start().y, s.end().y, 0.5))
            .collect();
        assert!((peaks[0] - 1.2).abs() < 1e-4);
        assert!(peaks[0] > peaks[1] && peaks[1] > peaks[2]);
    }

    #[test]
    fn drop_freezes_xz() {
        let (ball, cfg) = trajectory();
        let drop = &ball.segments()[4];
        for i in 0..=10 {
            let p = drop.sample(i as f32 / 10.0);
            assert_eq!(p.x, cfg.ball.bounce3.x);
            assert_eq!(p.z, cfg.ball.bounce3.z);
        }
        assert!((drop.sample(1.0).y - cfg.ball.hole.y).abs() < 1e-6);
    }

    #[test]
    fn continuous_across_every_boundary() {
        let (ball, cfg) = trajectory();
        let w = cfg.phases.ball_end - cfg.phases.ball_start;
        let mut boundaries = vec![cfg.phases.ball_start, cfg.phases.ball_end];
        for f in cfg.ball.phase_ends {
            boundaries.push(cfg.phases.ball_start + f * w);
        }
        // Flight quarter boundaries.
        for q in [0.25, 0.5, 0.75] {
            boundaries.push(cfg.phases.ball_start + q * cfg.ball.phase_ends[0] * w);
        }

        let eps = 1e-4;
        let max_velocity = 600.0;
        for b in boundaries {
            for center in [b - eps, b] {
                let a = ball.position(center);
                let c = ball.position(center + eps);
                assert!(
                    a.distance(c) <= eps * max_velocity,
                    "jump of {} near {b}",
                    a.distance(c)
                );
            }
        }
    }
}
