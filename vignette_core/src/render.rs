//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend.
//! The engine needs two capabilities from a host renderer: a camera it can
//! place every frame, and an off-screen capture of the current scene.

use bytes::Bytes;

use crate::camera::CameraPose;
use crate::math::{Mat4, Quat, Vec3};

/// Parameters for one off-screen capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureRequest {
    pub width: u32,
    pub height: u32,
    /// Whether the shatter overlay is visible while rendering. The
    /// controller always captures with the overlay hidden.
    pub overlay_visible: bool,
}

/// A snapshot of the rendered scene, tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Increments per capture, so a recapture is distinguishable.
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Bytes,
}

/// Render-to-texture capability.
pub trait FrameCapture {
    /// Renders the scene off-screen. Must complete within the frame.
    fn capture(&mut self, request: &CaptureRequest) -> anyhow::Result<CapturedFrame>;
}

/// A minimal rendering API.
pub trait RenderBackend: Send {
    fn begin_frame(&mut self);
    /// Places the perspective camera.
    fn set_camera(&mut self, pose: &CameraPose, orientation: Quat, view: Mat4);
    fn draw_debug_point(&mut self, position: Vec3);
    fn end_frame(&mut self);
}

/// A no-op renderer useful for headless runs and tests.
///
/// Captures return a black frame of the requested size.
#[derive(Debug, Default)]
pub struct NullRenderer {
    frames: u64,
    captures: u64,
    last_camera: Option<CameraPose>,
}

impl NullRenderer {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }

    pub fn last_camera(&self) -> Option<CameraPose> {
        self.last_camera
    }
}

impl RenderBackend for NullRenderer {
    fn begin_frame(&mut self) {}

    fn set_camera(&mut self, pose: &CameraPose, _orientation: Quat, _view: Mat4) {
        self.last_camera = Some(*pose);
    }

    fn draw_debug_point(&mut self, _position: Vec3) {}

    fn end_frame(&mut self) {
        self.frames += 1;
    }
}

impl FrameCapture for NullRenderer {
    fn capture(&mut self, request: &CaptureRequest) -> anyhow::Result<CapturedFrame> {
        self.captures += 1;
        let len = request.width as usize * request.height as usize * 4;
        Ok(CapturedFrame {
            id: self.captures,
            width: request.width,
            height: request.height,
            pixels: Bytes::from(vec![0u8; len]),
        })
    }
}
