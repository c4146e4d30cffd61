//! Camera trajectory.
//!
//! Each frame computes a target pose from progress, then moves the current
//! pose toward it with frame-rate independent exponential smoothing:
//!
//!   `current += (target - current) * (1 - base^dt)`
//!
//! The factor stays in [0,1], so the camera never overshoots.

use serde::{Deserialize, Serialize};

use crate::ball::BallTrajectory;
use crate::config::{CameraConfig, PhaseThresholds};
use crate::easing::band_fraction;
use crate::firework::Firework;
use crate::math::{clamp_unit, Vec3};

/// Eye position and look-at point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub eye: Vec3,
    pub look_at: Vec3,
}

impl CameraPose {
    /// Unit vector from eye toward the look-at point.
    pub fn forward(&self) -> Vec3 {
        (self.look_at - self.eye).normalize_or(-Vec3::new(0.0, 0.0, 1.0))
    }
}

/// Which rule produced the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    Static,
    BallFollow,
    FireworkFollow,
}

/// Computes the target pose for a progress value.
pub fn target_pose(
    progress: f32,
    cfg: &CameraConfig,
    phases: &PhaseThresholds,
    ball: &BallTrajectory,
    firework: &Firework,
) -> (CameraMode, CameraPose) {
    let p = clamp_unit(progress);

    if p <= phases.camera_follow {
        return (
            CameraMode::Static,
            CameraPose {
                eye: cfg.start_eye,
                look_at: cfg.start_look_at,
            },
        );
    }

    if p >= phases.firework_start {
        let focus = firework.focus_point(p);
        let f = band_fraction(p, phases.firework_start, 1.0);
        // Off to the left and behind, climbing with the rocket.
        let eye_offset = Vec3::new(-8.0, -5.0 + f * 10.0, 12.0);
        return (
            CameraMode::FireworkFollow,
            CameraPose {
                eye: focus + eye_offset,
                look_at: focus + Vec3::new(0.0, 2.0, 0.0),
            },
        );
    }

    let c = band_fraction(p, phases.camera_follow, phases.ball_end);
    let ball_pos = ball.position(p);
    let eye_offset = Vec3::new(-2.0 + c, 3.0 + c * 2.0, 8.0 - c * 3.0);
    let look_ahead = Vec3::new(2.0 + c, -1.0, -3.0 - c * 2.0);
    (
        CameraMode::BallFollow,
        CameraPose {
            eye: ball_pos + eye_offset,
            look_at: ball_pos + look_ahead,
        },
    )
}

/// Smoothing factor for a frame of `dt` seconds.
pub fn smoothing_factor(base: f32, dt: f32) -> f32 {
    1.0 - base.powf(dt.max(0.0))
}

/// Per-instance camera state persisted across frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub current: CameraPose,
    pub target: CameraPose,
    pub mode: CameraMode,
}

impl CameraState {
    /// Starts at rest on the static pose.
    pub fn new(cfg: &CameraConfig) -> Self {
        let pose = CameraPose {
            eye: cfg.start_eye,
            look_at: cfg.start_look_at,
        };
        Self {
            current: pose,
            target: pose,
            mode: CameraMode::Static,
        }
    }

    /// Advances one frame. Pure: returns the next state.
    pub fn step(
        self,
        progress: f32,
        dt: f32,
        cfg: &CameraConfig,
        phases: &PhaseThresholds,
        ball: &BallTrajectory,
        firework: &Firework,
    ) -> Self {
        let (mode, target) = target_pose(progress, cfg, phases, ball, firework);
        let k = smoothing_factor(cfg.smoothing_base, dt);
        Self {
            current: CameraPose {
                eye: self.current.eye.lerp(target.eye, k),
                look_at: self.current.look_at.lerp(target.look_at, k),
            },
            target,
            mode,
        }
    }
}
