//! Timeline: every evaluator behind one owned object.
//!
//! Evaluators never talk to each other; each frame they are sampled in turn
//! from the same progress value. Only the camera and the shatter controller
//! keep state between frames.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::backdrop::Backdrop;
use crate::ball::BallTrajectory;
use crate::camera::{CameraMode, CameraPose, CameraState};
use crate::character::{CharacterBinding, CharacterFrame};
use crate::config::TimelineConfig;
use crate::firework::{Firework, FireworkState};
use crate::math::{clamp_unit, Mat4, Quat, Vec3};
use crate::phase::Phase;
use crate::render::{FrameCapture, RenderBackend};
use crate::shatter::{ShatterController, ShatterEvent, ShatterPhase};

/// Everything evaluated for one frame.
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub progress: f32,
    pub phase: Phase,
    /// Set on the frame the phase changed, as `(from, to)`.
    pub phase_change: Option<(Phase, Phase)>,
    pub ball: Vec3,
    pub camera: CameraState,
    pub firework: FireworkState,
    pub shatter_phase: ShatterPhase,
    pub shatter_event: Option<ShatterEvent>,
    pub visible_chunks: usize,
    pub wall_visible: bool,
    pub backdrop: Backdrop,
    pub characters: Vec<(String, Option<CharacterFrame>)>,
}

/// Flat, serializable view of a [`FrameSample`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSummary {
    pub progress: f32,
    pub phase: Phase,
    pub ball: Vec3,
    pub camera: CameraPose,
    pub camera_mode: CameraMode,
    pub firework: String,
    pub rocket_height: Option<f32>,
    pub explosion_u: Option<f32>,
    pub shatter: ShatterPhase,
    pub visible_chunks: usize,
    pub wall_visible: bool,
    pub backdrop: Backdrop,
}

impl FrameSample {
    pub fn summary(&self) -> FrameSummary {
        let (rocket_height, explosion_u) = match &self.firework {
            FireworkState::Hidden => (None, None),
            FireworkState::RocketFlight(r) => (Some(r.height), None),
            FireworkState::Explosion(e) => (None, Some(e.u)),
        };
        FrameSummary {
            progress: self.progress,
            phase: self.phase,
            ball: self.ball,
            camera: self.camera.current,
            camera_mode: self.camera.mode,
            firework: self.firework.name().to_string(),
            rocket_height,
            explosion_u,
            shatter: self.shatter_phase,
            visible_chunks: self.visible_chunks,
            wall_visible: self.wall_visible,
            backdrop: self.backdrop,
        }
    }
}

pub struct Timeline {
    cfg: TimelineConfig,
    ball: BallTrajectory,
    firework: Firework,
    camera: CameraState,
    shatter: ShatterController,
    characters: Vec<CharacterBinding>,
    phase: Phase,
    firework_state: &'static str,
    clock: f32,
}

impl Timeline {
    /// Builds every evaluator. Fails on an invalid config.
    pub fn new(cfg: TimelineConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let ball = BallTrajectory::new(&cfg.ball, &cfg.phases);
        let firework = Firework::new(cfg.firework, cfg.phases.firework_start);
        let camera = CameraState::new(&cfg.camera);
        let shatter = ShatterController::new(cfg.shatter, &cfg.phases, cfg.viewport);
        info!(
            sparks = firework.sparks().len(),
            chunks = shatter.chunks().len(),
            "Timeline built"
        );
        Ok(Self {
            cfg,
            ball,
            firework,
            camera,
            shatter,
            characters: Vec::new(),
            phase: Phase::Idle,
            firework_state: FireworkState::Hidden.name(),
            clock: 0.0,
        })
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.cfg
    }

    pub fn ball(&self) -> &BallTrajectory {
        &self.ball
    }

    pub fn firework(&self) -> &Firework {
        &self.firework
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn shatter(&self) -> &ShatterController {
        &self.shatter
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn add_character(&mut self, character: CharacterBinding) {
        self.characters.push(character);
    }

    pub fn character_mut(&mut self, name: &str) -> Option<&mut CharacterBinding> {
        self.characters.iter_mut().find(|c| c.name() == name)
    }

    pub fn characters(&self) -> &[CharacterBinding] {
        &self.characters
    }

    /// Samples every evaluator for one frame and publishes the camera.
    pub fn frame<R>(&mut self, progress: f32, dt: f32, renderer: &mut R) -> FrameSample
    where
        R: RenderBackend + FrameCapture,
    {
        let p = clamp_unit(progress);
        let dt = dt.max(0.0);
        self.clock += dt;

        let phase = Phase::of(p, &self.cfg);
        let phase_change = (phase != self.phase).then_some((self.phase, phase));
        if let Some((from, to)) = phase_change {
            debug!(progress = p, %from, %to, "Phase changed");
            self.phase = phase;
        }

        renderer.begin_frame();

        let ball = self.ball.position(p);
        let firework = self.firework.evaluate(p, self.clock);
        if firework.name() != self.firework_state {
            info!(progress = p, from = self.firework_state, to = firework.name(), "Firework state");
            self.firework_state = firework.name();
        }

        self.camera = self.camera.step(
            p,
            dt,
            &self.cfg.camera,
            &self.cfg.phases,
            &self.ball,
            &self.firework,
        );
        let pose = self.camera.current;
        renderer.set_camera(
            &pose,
            Quat::look_at(pose.eye, pose.look_at, Vec3::Y),
            Mat4::look_at_rh(pose.eye, pose.look_at, Vec3::Y),
        );

        let characters = self
            .characters
            .iter_mut()
            .map(|c| (c.name().to_string(), c.update(p, dt)))
            .collect();

        renderer.draw_debug_point(ball);
        match &firework {
            FireworkState::RocketFlight(r) => renderer.draw_debug_point(r.position),
            FireworkState::Explosion(e) => renderer.draw_debug_point(e.center),
            FireworkState::Hidden => {}
        }

        // Capture after the camera moved so the frozen frame matches the view.
        let shatter_event = self.shatter.step(p, &pose, &mut *renderer);
        if let Some(event) = shatter_event {
            debug!(?event, "Shatter event");
        }

        renderer.end_frame();

        FrameSample {
            progress: p,
            phase,
            phase_change,
            ball,
            camera: self.camera,
            firework,
            shatter_phase: self.shatter.phase(),
            shatter_event,
            visible_chunks: self.shatter.chunks().iter().filter(|c| c.visible).count(),
            wall_visible: self.shatter.wall_visible(),
            backdrop: Backdrop::at(p, &self.cfg.phases),
            characters,
        }
    }
}
