//! Page layers around the 3D canvas: sky behind it, credits revealed by the
//! shatter.

use serde::{Deserialize, Serialize};

use crate::config::PhaseThresholds;
use crate::math::clamp_unit;

/// Credits fade in over this much progress.
const CREDITS_FADE: f32 = 0.08;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Backdrop {
    /// The 3D scene group is drawn.
    pub scene_visible: bool,
    pub sky_opacity: f32,
    pub credits_visible: bool,
    pub credits_opacity: f32,
}

impl Backdrop {
    pub fn at(progress: f32, phases: &PhaseThresholds) -> Self {
        let p = clamp_unit(progress);
        let revealed = p > phases.shatter_start;
        Self {
            scene_visible: p < phases.scene_hide,
            sky_opacity: if revealed { 0.0 } else { 1.0 },
            credits_visible: revealed,
            credits_opacity: if revealed {
                ((p - phases.shatter_start) / CREDITS_FADE).min(1.0)
            } else {
                0.0
            },
        }
    }
}
