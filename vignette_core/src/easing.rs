//! Easing curves and band remapping.
//!
//! Pure functions of a normalized `t`. Every phase-local fraction in the
//! engine goes through [`band_fraction`], so a zero-width band can only come
//! from a config that failed validation.

use std::f32::consts::PI;

/// Easing applied to a segment's local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    #[default]
    Linear,
    /// Slow end, `1 - (1-t)^2`.
    QuadOut,
    /// Stronger slow end, `1 - (1-t)^3`.
    CubicOut,
    /// Slow start and end.
    QuadInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => 1.0 - (1.0 - t).powi(2),
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Half-sine hump: 0 at both ends, 1 at the middle.
pub fn hump(t: f32) -> f32 {
    (PI * t).sin()
}

/// Position of `progress` inside `[start, end]`, clamped to [0,1].
///
/// Callers must only pass validated bands (`end > start`).
pub fn band_fraction(progress: f32, start: f32, end: f32) -> f32 {
    let width = end - start;
    if width <= 0.0 {
        return if progress >= end { 1.0 } else { 0.0 };
    }
    ((progress - start) / width).clamp(0.0, 1.0)
}

/// Rise-then-fall envelope: ramps linearly to `peak` over `[0, rise]`, then
/// falls at `fall_rate` per unit time, never below 0.
pub fn triangle_envelope(t: f32, rise: f32, peak: f32, fall_rate: f32) -> f32 {
    if t < rise {
        t / rise * peak
    } else {
        (peak - (t - rise) * fall_rate).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easings_hit_endpoints() {
        for e in [
            Easing::Linear,
            Easing::QuadOut,
            Easing::CubicOut,
            Easing::QuadInOut,
        ] {
            assert_eq!(e.apply(0.0), 0.0, "{e:?}");
            assert!((e.apply(1.0) - 1.0).abs() < 1e-6, "{e:?}");
        }
    }

    #[test]
    fn quad_in_out_is_continuous_at_half() {
        let below = Easing::QuadInOut.apply(0.5 - 1e-4);
        let above = Easing::QuadInOut.apply(0.5 + 1e-4);
        assert!((below - above).abs() < 1e-3);
    }

    #[test]
    fn band_fraction_clamps_outside_band() {
        assert_eq!(band_fraction(0.1, 0.38, 0.75), 0.0);
        assert_eq!(band_fraction(0.9, 0.38, 0.75), 1.0);
        assert!((band_fraction(0.565, 0.38, 0.75) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn triangle_envelope_peaks_then_decays() {
        assert_eq!(triangle_envelope(0.0, 0.2, 1.5, 1.8), 0.0);
        assert!((triangle_envelope(0.2, 0.2, 1.5, 1.8) - 1.5).abs() < 1e-6);
        assert_eq!(triangle_envelope(2.0, 0.2, 1.5, 1.8), 0.0);
    }
}
