//! `vignette_core`
//!
//! Scroll-driven timeline for the golf vignette: a single progress value in
//! `[0, 1]` drives the ball, camera, firework, character and screen-shatter
//! evaluators.
//!
//! Design goals:
//! - Deterministic: every random layout comes from a seeded generator.
//! - Evaluators are pure functions of progress, except camera smoothing and
//!   the shatter state machine.
//! - Rendering sits behind traits so everything runs headless.
//! - No `unsafe`.

pub mod backdrop;
pub mod ball;
pub mod camera;
pub mod character;
pub mod config;
pub mod console;
pub mod easing;
pub mod event;
pub mod firework;
pub mod math;
pub mod phase;
pub mod progress;
pub mod render;
pub mod rng;
pub mod shatter;
pub mod timeline;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::config::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::phase::Phase;
    pub use crate::progress::{ProgressSource, WheelOutcome};
    pub use crate::render::{FrameCapture, NullRenderer, RenderBackend};
    pub use crate::timeline::{FrameSample, FrameSummary, Timeline};
}
