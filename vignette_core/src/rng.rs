//! Seeded randomness for session-fixed layouts.
//!
//! Particle directions and shatter velocities are drawn once from a seeded
//! generator, so the same seed always produces the same layout.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic generator.
pub struct SessionRng {
    inner: StdRng,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform in `[0, 1)`.
    pub fn unit(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform in `[lo, lo + span)`.
    pub fn span(&mut self, lo: f32, span: f32) -> f32 {
        lo + self.unit() * span
    }

    /// Uniform in `[-half_width, half_width)`, i.e. `(rand - 0.5) * width`.
    pub fn centered(&mut self, width: f32) -> f32 {
        (self.unit() - 0.5) * width
    }

    /// Picks one entry.
    pub fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.inner.gen_range(0..items.len())]
    }

    /// True with probability `1 - threshold`.
    pub fn above(&mut self, threshold: f32) -> bool {
        self.unit() > threshold
    }
}
