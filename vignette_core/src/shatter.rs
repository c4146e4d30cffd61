//! Screen-shatter transition.
//!
//! State machine: `Idle → Captured → Exploding`, with a reset back to `Idle`
//! whenever progress drops below the reset threshold while a capture is
//! held. Capturing happens inside a single `step` when progress enters the
//! capture window: the tile group is hidden for the duration of the capture
//! and restored on every exit path.
//!
//! Tiles live in the group's local frame. The group itself is re-anchored in
//! front of the camera every frame.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::camera::CameraPose;
use crate::config::{PhaseThresholds, ShatterConfig, Viewport};
use crate::math::{clamp_unit, Euler, Quat, Vec3};
use crate::render::{CaptureRequest, CapturedFrame, FrameCapture};
use crate::rng::SessionRng;

/// Tiles overlap slightly so no gaps show between neighbours.
const TILE_OVERLAP: f32 = 1.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShatterPhase {
    Idle,
    Captured,
    Exploding,
}

/// Notable transitions, reported once each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShatterEvent {
    Captured { frame_id: u64 },
    CaptureFailed,
    ExplosionStarted,
    Reset,
}

/// Sub-rectangle of the capture, with `v = 0` at the bottom of the image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvRect {
    pub u_min: f32,
    pub u_max: f32,
    pub v_min: f32,
    pub v_max: f32,
}

/// One grid tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub width: f32,
    pub height: f32,
    pub uv: UvRect,
    pub start: Vec3,
    pub velocity: Vec3,
    pub rotation_rate: Vec3,
    pub position: Vec3,
    pub rotation: Euler,
    pub vel_z: f32,
    pub opacity: f32,
    pub visible: bool,
}

impl Chunk {
    fn reset(&mut self) {
        self.position = self.start;
        self.rotation = Euler::ZERO;
        self.vel_z = self.velocity.z;
        self.opacity = 1.0;
        self.visible = false;
    }

    /// True when the runtime transform equals the freshly built one.
    pub fn is_at_rest(&self) -> bool {
        self.position == self.start
            && self.rotation == Euler::ZERO
            && self.vel_z == self.velocity.z
            && self.opacity == 1.0
    }
}

/// Placement of the tile group in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: Vec3,
    pub orientation: Quat,
}

/// Scoped "overlay hidden" state: hides on creation, restores on drop.
struct HiddenOverlay<'a> {
    visible: &'a mut bool,
    restore: bool,
}

impl<'a> HiddenOverlay<'a> {
    fn hide(visible: &'a mut bool) -> Self {
        let restore = *visible;
        *visible = false;
        Self { visible, restore }
    }

    fn is_visible(&self) -> bool {
        *self.visible
    }
}

impl Drop for HiddenOverlay<'_> {
    fn drop(&mut self) {
        *self.visible = self.restore;
    }
}

pub struct ShatterController {
    cfg: ShatterConfig,
    capture_start: f32,
    shatter_start: f32,
    reset_below: f32,
    capture_size: (u32, u32),
    plane: (f32, f32),
    chunks: Vec<Chunk>,
    texture: Option<CapturedFrame>,
    phase: ShatterPhase,
    /// Set once a capture was tried in the current window.
    attempted: bool,
    group_visible: bool,
    wall_visible: bool,
    anchor: Anchor,
}

impl ShatterController {
    pub fn new(cfg: ShatterConfig, phases: &PhaseThresholds, viewport: Viewport) -> Self {
        let plane_height = cfg.plane_height;
        let plane_width = plane_height * viewport.aspect();
        let chunks = build_grid(&cfg, plane_width, plane_height);
        Self {
            capture_start: phases.texture_capture,
            shatter_start: phases.shatter_start,
            reset_below: phases.shatter_reset,
            capture_size: (
                viewport.width.min(cfg.max_capture_size),
                viewport.height.min(cfg.max_capture_size),
            ),
            plane: (plane_width, plane_height),
            chunks,
            texture: None,
            phase: ShatterPhase::Idle,
            attempted: false,
            group_visible: true,
            wall_visible: false,
            anchor: Anchor {
                position: Vec3::ZERO,
                orientation: Quat::IDENTITY,
            },
            cfg,
        }
    }

    pub fn phase(&self) -> ShatterPhase {
        self.phase
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn texture(&self) -> Option<&CapturedFrame> {
        self.texture.as_ref()
    }

    /// The uncut capture shown until the explosion starts.
    pub fn wall_visible(&self) -> bool {
        self.wall_visible
    }

    pub fn group_visible(&self) -> bool {
        self.group_visible
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Tile plane size in group units.
    pub fn plane_size(&self) -> (f32, f32) {
        self.plane
    }

    /// Advances one frame.
    pub fn step(
        &mut self,
        progress: f32,
        camera: &CameraPose,
        capture: &mut dyn FrameCapture,
    ) -> Option<ShatterEvent> {
        let p = clamp_unit(progress);
        let mut event = None;

        if p < self.reset_below {
            self.attempted = false;
            if self.texture.is_some() {
                self.reset();
                event = Some(ShatterEvent::Reset);
            }
        }

        let in_window = p >= self.capture_start && p < self.shatter_start;
        if in_window && self.texture.is_none() && !self.attempted {
            event = Some(self.take_capture(capture));
        }

        self.anchor = Anchor {
            position: camera.eye + camera.forward() * self.cfg.anchor_distance,
            orientation: Quat::look_at(camera.eye, camera.look_at, Vec3::Y),
        };

        let explode = p >= self.shatter_start && self.texture.is_some();
        self.wall_visible = self.texture.is_some() && !explode;

        if explode {
            if self.phase != ShatterPhase::Exploding {
                info!(progress = p, "Shatter explosion started");
                event = Some(ShatterEvent::ExplosionStarted);
            }
            self.phase = ShatterPhase::Exploding;
            self.advance_chunks();
        } else {
            for chunk in &mut self.chunks {
                chunk.visible = false;
            }
            self.phase = if self.texture.is_some() {
                ShatterPhase::Captured
            } else {
                ShatterPhase::Idle
            };
        }

        event
    }

    fn take_capture(&mut self, capture: &mut dyn FrameCapture) -> ShatterEvent {
        self.attempted = true;
        let (width, height) = self.capture_size;
        let result = {
            let overlay = HiddenOverlay::hide(&mut self.group_visible);
            capture.capture(&CaptureRequest {
                width,
                height,
                overlay_visible: overlay.is_visible(),
            })
        };

        match result {
            Ok(frame) => {
                let frame_id = frame.id;
                info!(frame_id, width, height, "Captured frame for shatter");
                self.texture = Some(frame);
                self.phase = ShatterPhase::Captured;
                ShatterEvent::Captured { frame_id }
            }
            Err(e) => {
                warn!(error = %e, "Shatter capture failed");
                ShatterEvent::CaptureFailed
            }
        }
    }

    fn advance_chunks(&mut self) {
        let cfg = &self.cfg;
        for chunk in &mut self.chunks {
            chunk.visible = true;
            chunk.vel_z += cfg.explosive_force;

            if chunk.position.z < cfg.hide_z {
                chunk.position.x += chunk.velocity.x;
                chunk.position.y += chunk.velocity.y;
                chunk.position.z += chunk.vel_z;
                chunk.rotation.advance(chunk.rotation_rate);

                if chunk.position.z > cfg.fade_start_z {
                    chunk.opacity =
                        (1.0 - (chunk.position.z - cfg.fade_start_z) * cfg.fade_rate).max(0.0);
                }
            } else {
                chunk.visible = false;
            }
        }
    }

    /// Restores every tile and drops the held capture.
    pub fn reset(&mut self) {
        debug!("Shatter reset");
        self.texture = None;
        self.phase = ShatterPhase::Idle;
        self.wall_visible = false;
        for chunk in &mut self.chunks {
            chunk.reset();
        }
    }
}

fn build_grid(cfg: &ShatterConfig, plane_width: f32, plane_height: f32) -> Vec<Chunk> {
    let mut rng = SessionRng::new(cfg.seed);
    let cols = cfg.cols as f32;
    let rows = cfg.rows as f32;
    let tile_w = plane_width / cols;
    let tile_h = plane_height / rows;

    let mut chunks = Vec::with_capacity((cfg.cols * cfg.rows) as usize);
    for i in 0..cfg.cols {
        for j in 0..cfg.rows {
            let (fi, fj) = (i as f32, j as f32);
            let start = Vec3::new(
                (fi - cols / 2.0 + 0.5) * tile_w,
                (fj - rows / 2.0 + 0.5) * tile_h,
                0.0,
            );
            let velocity = Vec3::new(
                rng.centered(0.03),
                rng.centered(0.03),
                rng.span(0.01, 0.02),
            );
            let rotation_rate = Vec3::new(rng.centered(0.06), rng.centered(0.06), rng.centered(0.06));
            chunks.push(Chunk {
                width: tile_w * TILE_OVERLAP,
                height: tile_h * TILE_OVERLAP,
                uv: UvRect {
                    u_min: fi / cols,
                    u_max: (fi + 1.0) / cols,
                    v_min: fj / rows,
                    v_max: (fj + 1.0) / rows,
                },
                start,
                velocity,
                rotation_rate,
                position: start,
                rotation: Euler::ZERO,
                vel_z: velocity.z,
                opacity: 1.0,
                visible: false,
            });
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use crate::render::NullRenderer;

    fn controller() -> ShatterController {
        let cfg = TimelineConfig::default();
        ShatterController::new(cfg.shatter, &cfg.phases, cfg.viewport)
    }

    fn pose() -> CameraPose {
        CameraPose {
            eye: Vec3::new(0.0, 10.0, 55.0),
            look_at: Vec3::new(0.0, 4.0, 40.0),
        }
    }

    /// Records requests and can be told to fail.
    #[derive(Default)]
    struct FakeCapture {
        requests: Vec<CaptureRequest>,
        fail: bool,
    }

    impl FrameCapture for FakeCapture {
        fn capture(&mut self, request: &CaptureRequest) -> anyhow::Result<CapturedFrame> {
            self.requests.push(*request);
            if self.fail {
                anyhow::bail!("device lost");
            }
            Ok(CapturedFrame {
                id: self.requests.len() as u64,
                width: request.width,
                height: request.height,
                pixels: bytes::Bytes::new(),
            })
        }
    }

    #[test]
    fn grid_uvs_tile_the_capture() {
        let c = controller();
        assert_eq!(c.chunks().len(), 48);
        let area: f32 = c
            .chunks()
            .iter()
            .map(|ch| (ch.uv.u_max - ch.uv.u_min) * (ch.uv.v_max - ch.uv.v_min))
            .sum();
        assert!((area - 1.0).abs() < 1e-5);

        // Each tile's UV centre matches its normalized position on the plane.
        let (w, h) = c.plane_size();
        for ch in c.chunks() {
            let u = (ch.uv.u_min + ch.uv.u_max) / 2.0;
            let v = (ch.uv.v_min + ch.uv.v_max) / 2.0;
            assert!((u - (ch.start.x / w + 0.5)).abs() < 1e-5);
            assert!((v - (ch.start.y / h + 0.5)).abs() < 1e-5);
        }
    }

    #[test]
    fn capture_size_is_capped() {
        let mut cfg = TimelineConfig::default();
        cfg.viewport = Viewport {
            width: 2560,
            height: 900,
        };
        let mut c = ShatterController::new(cfg.shatter, &cfg.phases, cfg.viewport);
        let mut cap = FakeCapture::default();
        c.step(0.885, &pose(), &mut cap);
        assert_eq!(cap.requests[0].width, 1024);
        assert_eq!(cap.requests[0].height, 900);
    }

    #[test]
    fn capture_hides_overlay_and_restores_it() {
        let mut c = controller();
        let mut cap = FakeCapture::default();
        let event = c.step(0.885, &pose(), &mut cap);
        assert_eq!(event, Some(ShatterEvent::Captured { frame_id: 1 }));
        assert!(!cap.requests[0].overlay_visible);
        assert!(c.group_visible());
        assert!(c.wall_visible());
        assert_eq!(c.phase(), ShatterPhase::Captured);
    }

    #[test]
    fn failed_capture_still_restores_overlay_and_is_not_retried() {
        let mut c = controller();
        let mut cap = FakeCapture {
            fail: true,
            ..Default::default()
        };
        assert_eq!(
            c.step(0.881, &pose(), &mut cap),
            Some(ShatterEvent::CaptureFailed)
        );
        assert!(c.group_visible());
        c.step(0.882, &pose(), &mut cap);
        c.step(0.95, &pose(), &mut cap);
        assert_eq!(cap.requests.len(), 1);
        assert_eq!(c.phase(), ShatterPhase::Idle);
        assert!(c.chunks().iter().all(|ch| !ch.visible));
    }

    #[test]
    fn captures_once_per_window() {
        let mut c = controller();
        let mut cap = FakeCapture::default();
        for i in 0..10 {
            c.step(0.880 + i as f32 * 0.0009, &pose(), &mut cap);
        }
        assert_eq!(cap.requests.len(), 1);
    }

    #[test]
    fn no_explosion_without_capture() {
        let mut c = controller();
        let mut cap = NullRenderer::default();
        c.step(0.95, &pose(), &mut cap);
        assert_eq!(c.phase(), ShatterPhase::Idle);
        assert_eq!(cap.captures(), 0);
    }

    #[test]
    fn explosion_moves_tiles_toward_viewer_and_hides_them() {
        let mut c = controller();
        let mut cap = NullRenderer::default();
        c.step(0.885, &pose(), &mut cap);
        assert_eq!(
            c.step(0.89, &pose(), &mut cap),
            Some(ShatterEvent::ExplosionStarted)
        );
        assert!(!c.wall_visible());
        assert!(c.chunks().iter().all(|ch| ch.visible && ch.position.z > 0.0));

        for _ in 0..400 {
            c.step(0.95, &pose(), &mut cap);
        }
        for ch in c.chunks() {
            assert!(ch.position.z >= 12.0);
            assert!(!ch.visible);
            assert_eq!(ch.opacity, 0.0);
        }
    }

    #[test]
    fn z_velocity_accelerates() {
        let mut c = controller();
        let mut cap = NullRenderer::default();
        c.step(0.885, &pose(), &mut cap);
        c.step(0.9, &pose(), &mut cap);
        let z1 = c.chunks()[0].position.z;
        c.step(0.9, &pose(), &mut cap);
        let z2 = c.chunks()[0].position.z;
        c.step(0.9, &pose(), &mut cap);
        let z3 = c.chunks()[0].position.z;
        assert!(z3 - z2 > z2 - z1);
    }

    #[test]
    fn round_trip_resets_tiles_and_recaptures() {
        let mut c = controller();
        let mut cap = NullRenderer::default();
        let mut p = 0.5;
        while p < 1.0 {
            c.step(p, &pose(), &mut cap);
            p += 0.0004;
        }
        c.step(1.0, &pose(), &mut cap);
        assert_eq!(c.phase(), ShatterPhase::Exploding);
        let first = c.texture().map(|t| t.id);

        let mut events = Vec::new();
        while p > 0.5 {
            p -= 0.0004;
            events.extend(c.step(p, &pose(), &mut cap));
        }
        assert!(events.contains(&ShatterEvent::Reset));
        assert!(c.texture().is_none());
        assert_eq!(c.phase(), ShatterPhase::Idle);
        assert!(c.chunks().iter().all(|ch| ch.is_at_rest() && !ch.visible));

        c.step(0.885, &pose(), &mut cap);
        let second = c.texture().map(|t| t.id);
        assert_eq!(cap.captures(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn group_anchored_in_front_of_camera() {
        let mut c = controller();
        let mut cap = NullRenderer::default();
        let camera = pose();
        c.step(0.1, &camera, &mut cap);
        let anchor = c.anchor();
        assert!((anchor.position.distance(camera.eye) - 2.5).abs() < 1e-4);
        let forward = anchor.orientation.rotate(Vec3::new(0.0, 0.0, -1.0));
        assert!(forward.distance(camera.forward()) < 1e-4);
    }
}
