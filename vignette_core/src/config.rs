//! Configuration system.
//!
//! Loads timeline configuration from JSON strings/files. Every field has a
//! default, so `{}` is a complete config carrying the tuned constants.
//! The constants are opaque tuning: they were placed by eye and are kept
//! exactly, not derived.

use std::path::Path;

use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::math::Vec3;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimelineConfig {
    pub phases: PhaseThresholds,
    pub scroll: ScrollConfig,
    pub ball: BallConfig,
    pub camera: CameraConfig,
    pub firework: FireworkConfig,
    pub shatter: ShatterConfig,
    pub viewport: Viewport,
}

/// Progress thresholds partitioning the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    /// Character starts the swing.
    pub swing_start: f32,
    /// Ball leaves the tee.
    pub ball_start: f32,
    /// Camera starts following the ball.
    pub camera_follow: f32,
    /// Ball is in the hole.
    pub ball_end: f32,
    /// Rocket launches.
    pub firework_start: f32,
    /// Below this a held capture is discarded.
    pub shatter_reset: f32,
    /// Start of the capture window.
    pub texture_capture: f32,
    /// The 3D scene is hidden from here on.
    pub scene_hide: f32,
    /// Tiles start flying.
    pub shatter_start: f32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            swing_start: 0.30,
            ball_start: 0.38,
            camera_follow: 0.40,
            ball_end: 0.75,
            firework_start: 0.75,
            shatter_reset: 0.80,
            texture_capture: 0.88,
            scene_hide: 0.889,
            shatter_start: 0.89,
        }
    }
}

/// Wheel input and autoplay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Progress per unit of wheel `deltaY`.
    pub wheel_scale: f32,
    /// Progress added per autoplay frame.
    pub autoplay_step: f32,
    /// Forward wheel input is ignored at or above this progress.
    pub forward_lock: f32,
    /// Autoplay runs in `[autoplay_start, 1)`.
    pub autoplay_start: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            wheel_scale: 0.00015,
            autoplay_step: 0.0004,
            forward_lock: 0.75,
            autoplay_start: 0.75,
        }
    }
}

/// Ball control points, expressed relative to `origin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    /// World offset of the tee group.
    pub origin: Vec3,
    pub tee: Vec3,
    pub flight_waypoints: [Vec3; 3],
    pub landing: Vec3,
    pub bounce1_mid: Vec3,
    pub bounce1: Vec3,
    pub bounce2_mid: Vec3,
    pub bounce2: Vec3,
    /// Top of the micro-bounce, directly over the hole.
    pub bounce3: Vec3,
    pub hole: Vec3,
    /// Ends of flight, bounce 1, bounce 2 and bounce 3 in ball-local time.
    pub phase_ends: [f32; 4],
    pub flight_height: f32,
    pub bounce_heights: [f32; 3],
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::new(-0.2, 3.6, 40.0),
            tee: Vec3::new(0.0, 0.45, 0.0),
            flight_waypoints: [
                Vec3::new(2.0, 0.3, -10.0),
                Vec3::new(4.0, 0.1, -25.0),
                Vec3::new(5.5, -1.5, -38.0),
            ],
            landing: Vec3::new(7.0, -2.6, -48.0),
            bounce1_mid: Vec3::new(7.08, -2.6, -49.0),
            bounce1: Vec3::new(7.15, -2.6, -50.0),
            bounce2_mid: Vec3::new(7.1, -2.6, -49.5),
            bounce2: Vec3::new(7.15, -2.6, -50.0),
            bounce3: Vec3::new(7.2, -2.58, -51.0),
            hole: Vec3::new(7.2, -2.9, -51.0),
            phase_ends: [0.55, 0.70, 0.85, 0.95],
            flight_height: 18.0,
            bounce_heights: [1.2, 0.5, 0.2],
        }
    }
}

/// Camera rig.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub start_eye: Vec3,
    pub start_look_at: Vec3,
    /// Fraction of the gap left after one second of smoothing.
    pub smoothing_base: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            start_eye: Vec3::new(0.0, 10.0, 55.0),
            start_look_at: Vec3::new(0.0, 4.0, 40.0),
            smoothing_base: 0.001,
        }
    }
}

/// Rocket and burst.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireworkConfig {
    /// Launch point in world space.
    pub origin: Vec3,
    pub explosion_height: f32,
    /// Local fraction of the firework window at which the rocket bursts.
    pub rocket_phase_end: f32,
    /// Drop of the burst centre at the end of the explosion.
    pub gravity_drop: f32,
    pub wobble_frequency: f32,
    pub wobble_amplitude: f32,
    pub seed: u64,
}

impl Default for FireworkConfig {
    fn default() -> Self {
        Self {
            origin: Vec3::new(7.0, 1.0, -11.0),
            explosion_height: 30.0,
            rocket_phase_end: 0.5,
            gravity_drop: 60.0,
            wobble_frequency: 25.0,
            wobble_amplitude: 0.05,
            seed: 0x00f1_2e30_2c5a_71e5,
        }
    }
}

/// Screen-shatter grid and motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShatterConfig {
    pub cols: u32,
    pub rows: u32,
    /// Height of the tile plane in front of the camera.
    pub plane_height: f32,
    /// Distance of the tile plane along the camera forward vector.
    pub anchor_distance: f32,
    /// Capture resolution cap per side.
    pub max_capture_size: u32,
    /// Added to each tile's z velocity every exploding frame.
    pub explosive_force: f32,
    pub fade_start_z: f32,
    pub fade_rate: f32,
    /// Tiles at or beyond this z are hidden.
    pub hide_z: f32,
    pub seed: u64,
}

impl Default for ShatterConfig {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 6,
            plane_height: 2.8,
            anchor_distance: 2.5,
            max_capture_size: 1024,
            explosive_force: 0.0015,
            fade_start_z: 4.0,
            fade_rate: 0.15,
            hide_z: 12.0,
            seed: 0x5a17_7e12_0b0b_1e55,
        }
    }
}

/// Render surface size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Viewport {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl TimelineConfig {
    /// Parses and validates config from JSON.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse timeline config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("load config {}", path.display()))?;
        info!(path = %path.display(), "Timeline config loaded");
        Ok(cfg)
    }

    /// Rejects misordered or zero-width bands.
    pub fn validate(&self) -> anyhow::Result<()> {
        let p = &self.phases;
        for (name, v) in [
            ("swing_start", p.swing_start),
            ("ball_start", p.ball_start),
            ("camera_follow", p.camera_follow),
            ("ball_end", p.ball_end),
            ("firework_start", p.firework_start),
            ("shatter_reset", p.shatter_reset),
            ("texture_capture", p.texture_capture),
            ("scene_hide", p.scene_hide),
            ("shatter_start", p.shatter_start),
        ] {
            ensure!(
                (0.0..=1.0).contains(&v),
                "phases.{name} = {v} is outside [0, 1]"
            );
        }
        ensure!(
            p.swing_start <= p.ball_start,
            "phases: swing_start must not exceed ball_start"
        );
        ensure!(
            p.ball_start < p.camera_follow && p.camera_follow < p.ball_end,
            "phases: need ball_start < camera_follow < ball_end"
        );
        ensure!(
            p.ball_end <= p.firework_start,
            "phases: ball_end must not exceed firework_start"
        );
        ensure!(
            p.firework_start < 1.0,
            "phases: firework band [firework_start, 1] has zero width"
        );
        ensure!(
            p.firework_start <= p.shatter_reset
                && p.shatter_reset < p.texture_capture
                && p.texture_capture < p.shatter_start,
            "phases: need firework_start <= shatter_reset < texture_capture < shatter_start"
        );
        ensure!(
            p.texture_capture <= p.scene_hide && p.scene_hide <= p.shatter_start,
            "phases: scene_hide must lie inside the capture window"
        );

        let b = &self.ball;
        let mut prev = 0.0;
        for end in b.phase_ends {
            ensure!(
                end > prev && end < 1.0,
                "ball.phase_ends must be strictly increasing inside (0, 1), got {:?}",
                b.phase_ends
            );
            prev = end;
        }

        let s = &self.scroll;
        ensure!(s.wheel_scale > 0.0, "scroll.wheel_scale must be positive");
        ensure!(s.autoplay_step > 0.0, "scroll.autoplay_step must be positive");
        ensure!(
            (0.0..=1.0).contains(&s.forward_lock),
            "scroll.forward_lock must be within [0, 1]"
        );
        ensure!(
            (0.0..1.0).contains(&s.autoplay_start),
            "scroll.autoplay_start must be within [0, 1)"
        );

        let c = &self.camera;
        ensure!(
            c.smoothing_base > 0.0 && c.smoothing_base < 1.0,
            "camera.smoothing_base must be inside (0, 1)"
        );

        let f = &self.firework;
        ensure!(
            f.rocket_phase_end > 0.0 && f.rocket_phase_end < 1.0,
            "firework.rocket_phase_end must be inside (0, 1)"
        );

        let sh = &self.shatter;
        if sh.cols == 0 || sh.rows == 0 {
            bail!("shatter grid must have at least one column and one row");
        }
        ensure!(
            sh.plane_height > 0.0,
            "shatter.plane_height must be positive"
        );
        ensure!(
            sh.fade_start_z < sh.hide_z,
            "shatter.fade_start_z must be below hide_z"
        );
        ensure!(
            sh.max_capture_size > 0,
            "shatter.max_capture_size must be positive"
        );
        ensure!(
            self.viewport.width > 0 && self.viewport.height > 0,
            "viewport must be non-empty"
        );
        Ok(())
    }
}
