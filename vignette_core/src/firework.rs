//! Firework evaluator.
//!
//! `Hidden → RocketFlight → Explosion`, selected purely from progress. The
//! spark population is generated once from a seed; every frame only derives
//! transforms and material parameters from the explosion's local time `u`.
//! Pulling progress back below the launch threshold yields `Hidden` again.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use serde::{Deserialize, Serialize};

use crate::config::FireworkConfig;
use crate::easing::{band_fraction, triangle_envelope, Easing};
use crate::math::{clamp_unit, Euler, Vec3};
use crate::rng::SessionRng;

/// Packed `0xRRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

const INNER_PALETTE: [Color; 5] = [
    Color(0xff0000),
    Color(0xff3300),
    Color(0xff6600),
    Color(0xffaa00),
    Color(0xffff00),
];
const OUTER_PALETTE: [Color; 5] = [
    Color(0xffdd00),
    Color(0xffcc00),
    Color(0xffaa00),
    Color(0xffffff),
    Color(0xffffaa),
];
const STAR_PALETTE: [Color; 7] = [
    Color(0xff4444),
    Color(0xff6600),
    Color(0xffcc00),
    Color(0xffffff),
    Color(0xff0066),
    Color(0xff00ff),
    Color(0x00ffff),
];
const SECONDARY_PALETTE: [Color; 5] = [
    Color(0xff3300),
    Color(0xffaa00),
    Color(0x00ff88),
    Color(0x00aaff),
    Color(0xff00aa),
];
const RING_COLORS: [Color; 3] = [Color(0xffff00), Color(0xff6600), Color(0xff0066)];

pub const INNER_SPARKS: usize = 40;
pub const OUTER_SPARKS: usize = 30;
pub const STAR_SPARKS: usize = 50;
pub const SECONDARY_SPARKS: usize = 25;
pub const RING_COUNT: usize = 3;

/// Primary burst particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spark {
    /// Unit direction of the spark's rest offset.
    pub direction: Vec3,
    pub radius: f32,
    pub color: Color,
    pub size: f32,
    /// Multiplier on explosion time.
    pub speed: f32,
    pub trail: bool,
}

impl Spark {
    fn from_offset(offset: Vec3, color: Color, size: f32, speed: f32, trail: bool) -> Self {
        Self {
            direction: offset.normalize_or(Vec3::Y),
            radius: offset.len(),
            color,
            size,
            speed,
            trail,
        }
    }

    pub fn base(&self) -> Vec3 {
        self.direction * self.radius
    }
}

/// Delayed micro-burst particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondarySpark {
    pub offset: Vec3,
    /// Explosion time before this spark appears.
    pub delay: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RocketSample {
    /// Local rocket-phase fraction in [0,1].
    pub rocket_t: f32,
    /// Height above the launch point.
    pub height: f32,
    pub position: Vec3,
    pub roll: f32,
    pub trail_position: Vec3,
    /// Vertical stretch of the trail.
    pub trail_stretch: f32,
    pub trail_glow: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparkSample {
    /// Offset from the burst centre.
    pub offset: Vec3,
    pub scale: f32,
    pub opacity: f32,
    pub glow: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SecondarySample {
    pub visible: bool,
    pub offset: Vec3,
    pub scale: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingSample {
    pub visible: bool,
    pub scale: f32,
    pub opacity: f32,
    pub tilt: Euler,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowSample {
    pub scale: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExplosionSample {
    /// Explosion-local time in [0,1].
    pub u: f32,
    pub center: Vec3,
    pub sparks: Vec<SparkSample>,
    pub secondary: Vec<SecondarySample>,
    pub rings: [RingSample; RING_COUNT],
    pub glow: GlowSample,
}

/// Evaluated firework for one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FireworkState {
    Hidden,
    RocketFlight(RocketSample),
    Explosion(ExplosionSample),
}

impl FireworkState {
    pub fn rocket_visible(&self) -> bool {
        matches!(self, FireworkState::RocketFlight(_))
    }

    pub fn trail_visible(&self) -> bool {
        self.rocket_visible()
    }

    pub fn explosion_visible(&self) -> bool {
        matches!(self, FireworkState::Explosion(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            FireworkState::Hidden => "hidden",
            FireworkState::RocketFlight(_) => "rocket",
            FireworkState::Explosion(_) => "explosion",
        }
    }
}

/// Firework with its session-fixed particle layout.
#[derive(Debug, Clone)]
pub struct Firework {
    cfg: FireworkConfig,
    start: f32,
    sparks: Vec<Spark>,
    secondary: Vec<SecondarySpark>,
}

impl Firework {
    pub fn new(cfg: FireworkConfig, firework_start: f32) -> Self {
        let mut rng = SessionRng::new(cfg.seed);
        let sparks = generate_sparks(&mut rng);
        let secondary = generate_secondary(&mut rng);
        Self {
            cfg,
            start: firework_start,
            sparks,
            secondary,
        }
    }

    pub fn sparks(&self) -> &[Spark] {
        &self.sparks
    }

    pub fn secondary_sparks(&self) -> &[SecondarySpark] {
        &self.secondary
    }

    /// Evaluates the firework. `clock` is wall time in seconds and only
    /// drives the rocket wobble and trail flicker.
    pub fn evaluate(&self, progress: f32, clock: f32) -> FireworkState {
        let p = clamp_unit(progress);
        if p < self.start {
            return FireworkState::Hidden;
        }

        let local = band_fraction(p, self.start, 1.0);
        let split = self.cfg.rocket_phase_end;
        if local <= split {
            FireworkState::RocketFlight(self.rocket(local / split, clock))
        } else {
            FireworkState::Explosion(self.explosion(band_fraction(local, split, 1.0)))
        }
    }

    /// Point the camera tracks: the rocket without wobble, then the burst at
    /// its peak height.
    pub fn focus_point(&self, progress: f32) -> Vec3 {
        let p = clamp_unit(progress);
        if p < self.start {
            return self.cfg.origin;
        }
        let local = band_fraction(p, self.start, 1.0);
        let split = self.cfg.rocket_phase_end;
        let lift = if local <= split {
            self.rocket_height(local / split)
        } else {
            self.cfg.explosion_height
        };
        self.cfg.origin + Vec3::new(0.0, lift, 0.0)
    }

    fn rocket_height(&self, rocket_t: f32) -> f32 {
        Easing::CubicOut.apply(rocket_t) * self.cfg.explosion_height
    }

    fn rocket(&self, rocket_t: f32, clock: f32) -> RocketSample {
        let height = self.rocket_height(rocket_t);
        let wobble = (clock * self.cfg.wobble_frequency).sin() * self.cfg.wobble_amplitude;
        RocketSample {
            rocket_t,
            height,
            position: self.cfg.origin + Vec3::new(wobble, height, 0.0),
            roll: wobble * 0.5,
            trail_position: self.cfg.origin + Vec3::new(0.0, height - 0.3, 0.0),
            trail_stretch: 0.3 + rocket_t * 0.8,
            trail_glow: 2.0 + (clock * 30.0).sin() * 0.5,
        }
    }

    fn explosion(&self, u: f32) -> ExplosionSample {
        let drop = u * u * self.cfg.gravity_drop;
        let center = self.cfg.origin + Vec3::new(0.0, self.cfg.explosion_height - drop, 0.0);

        let sparks = self
            .sparks
            .iter()
            .map(|spark| {
                let t = u * spark.speed;
                let spread = (t * 3.0).min(3.0);
                SparkSample {
                    offset: spark.base() * spread - Vec3::new(0.0, t * t * 8.0, 0.0),
                    scale: triangle_envelope(t, 0.2, 1.5, 1.8),
                    opacity: (1.0 - t * 1.5).max(0.0),
                    glow: (3.0 - t * 4.0).max(0.0),
                }
            })
            .collect();

        let secondary = self
            .secondary
            .iter()
            .map(|spark| {
                let d = (u - spark.delay).max(0.0);
                if d <= 0.0 {
                    return SecondarySample::default();
                }
                SecondarySample {
                    visible: true,
                    offset: Vec3::new(
                        spark.offset.x + (d * 10.0).sin() * 0.5,
                        spark.offset.y - d * d * 5.0,
                        spark.offset.z,
                    ),
                    scale: triangle_envelope(d, 0.1, 1.0, 1.5) * 1.5,
                    opacity: (1.0 - d * 2.0).max(0.0),
                }
            })
            .collect();

        let rings = std::array::from_fn(|i| {
            let fi = i as f32;
            let rt = (u - fi * 0.1).max(0.0);
            RingSample {
                visible: rt > 0.0,
                scale: rt * 8.0 * (1.0 + fi * 0.5),
                opacity: (0.8 - rt * 2.0).max(0.0),
                tilt: Euler::new(FRAC_PI_2 + fi * 0.3, 0.0, fi * 0.5),
                color: RING_COLORS[i],
            }
        });

        let glow = GlowSample {
            scale: triangle_envelope(u, 0.15, 4.0, 6.0),
            opacity: (1.0 - u * 1.5).max(0.0),
        };

        ExplosionSample {
            u,
            center,
            sparks,
            secondary,
            rings,
            glow,
        }
    }
}

fn generate_sparks(rng: &mut SessionRng) -> Vec<Spark> {
    let mut sparks = Vec::with_capacity(INNER_SPARKS + OUTER_SPARKS + STAR_SPARKS);

    // Inner ring: fast, slightly lifted.
    for i in 0..INNER_SPARKS {
        let theta = i as f32 / INNER_SPARKS as f32 * TAU + rng.unit() * 0.3;
        let phi = FRAC_PI_2 + rng.centered(0.8);
        let r = rng.span(3.0, 2.0);
        let speed = rng.span(0.8, 0.4);
        let lift = rng.unit() * 2.0;
        let offset = Vec3::new(
            phi.sin() * theta.cos() * r,
            phi.cos() * r + lift,
            phi.sin() * theta.sin() * r,
        );
        let color = rng.pick(&INNER_PALETTE);
        let size = rng.span(0.15, 0.2);
        let trail = rng.above(0.5);
        sparks.push(Spark::from_offset(offset, color, size, speed, trail));
    }

    // Outer ring: slow, gold.
    for i in 0..OUTER_SPARKS {
        let theta = i as f32 / OUTER_SPARKS as f32 * TAU;
        let phi = FRAC_PI_2 + rng.centered(0.5);
        let r = rng.span(5.0, 3.0);
        let offset = Vec3::new(
            phi.sin() * theta.cos() * r,
            phi.cos() * r,
            phi.sin() * theta.sin() * r,
        );
        let color = rng.pick(&OUTER_PALETTE);
        let size = rng.span(0.1, 0.15);
        let speed = rng.span(0.5, 0.3);
        sparks.push(Spark::from_offset(offset, color, size, speed, true));
    }

    // Scattered stars.
    for _ in 0..STAR_SPARKS {
        let theta = rng.unit() * TAU;
        let phi = rng.unit() * PI;
        let r = rng.span(2.0, 6.0);
        let offset = Vec3::new(
            phi.sin() * theta.cos() * r,
            phi.cos() * r,
            phi.sin() * theta.sin() * r,
        );
        let color = rng.pick(&STAR_PALETTE);
        let size = rng.span(0.08, 0.12);
        let speed = rng.span(0.6, 0.6);
        let trail = rng.above(0.3);
        sparks.push(Spark::from_offset(offset, color, size, speed, trail));
    }

    sparks
}

fn generate_secondary(rng: &mut SessionRng) -> Vec<SecondarySpark> {
    (0..SECONDARY_SPARKS)
        .map(|_| {
            let theta = rng.unit() * TAU;
            let r = rng.span(3.0, 4.0);
            let y = rng.unit() * 4.0 - 2.0;
            SecondarySpark {
                offset: Vec3::new(theta.cos() * r, y, theta.sin() * r),
                delay: rng.span(0.2, 0.3),
                color: rng.pick(&SECONDARY_PALETTE),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firework() -> Firework {
        Firework::new(FireworkConfig::default(), 0.75)
    }

    #[test]
    fn layout_is_fixed_per_seed() {
        let a = firework();
        let b = firework();
        assert_eq!(a.sparks(), b.sparks());
        assert_eq!(a.secondary_sparks(), b.secondary_sparks());
        assert_eq!(a.sparks().len(), INNER_SPARKS + OUTER_SPARKS + STAR_SPARKS);
        assert_eq!(a.secondary_sparks().len(), SECONDARY_SPARKS);
    }

    #[test]
    fn spark_attributes_in_range() {
        let fw = firework();
        for s in fw.sparks() {
            assert!((s.direction.len() - 1.0).abs() < 1e-4);
            assert!((0.5..1.2).contains(&s.speed));
        }
        for s in fw.secondary_sparks() {
            assert!((0.2..0.5).contains(&s.delay));
        }
    }

    #[test]
    fn hidden_before_launch() {
        let fw = firework();
        let state = fw.evaluate(0.74, 0.0);
        assert_eq!(state, FireworkState::Hidden);
        assert!(!state.rocket_visible() && !state.trail_visible() && !state.explosion_visible());
    }

    #[test]
    fn rocket_just_after_launch() {
        let fw = firework();
        let state = fw.evaluate(0.76, 0.0);
        let FireworkState::RocketFlight(rocket) = &state else {
            panic!("expected rocket, got {}", state.name());
        };
        assert!(rocket.height > 0.0 && rocket.height < 30.0);
        assert!(state.rocket_visible() && state.trail_visible());
        assert!(!state.explosion_visible());
    }

    #[test]
    fn explosion_excludes_rocket() {
        let fw = firework();
        // Local fraction 0.6 is past the 0.5 split.
        let state = fw.evaluate(0.75 + 0.25 * 0.6, 0.0);
        assert!(state.explosion_visible());
        assert!(!state.rocket_visible() && !state.trail_visible());
    }

    #[test]
    fn rocket_reaches_burst_height_at_split() {
        let fw = firework();
        let state = fw.evaluate(0.75 + 0.25 * 0.5, 0.0);
        let FireworkState::RocketFlight(rocket) = state else {
            panic!("expected rocket");
        };
        assert!((rocket.height - 30.0).abs() < 1e-3);
    }

    #[test]
    fn wobble_stays_small() {
        let fw = firework();
        for i in 0..50 {
            if let FireworkState::RocketFlight(r) = fw.evaluate(0.8, i as f32 * 0.013) {
                assert!((r.position.x - 7.0).abs() <= 0.05 + 1e-6);
            }
        }
    }

    #[test]
    fn terminal_state_has_faded() {
        let fw = firework();
        let FireworkState::Explosion(ex) = fw.evaluate(1.0, 0.0) else {
            panic!("expected explosion");
        };
        assert_eq!(ex.u, 1.0);
        assert_eq!(ex.glow.scale, 0.0);
        assert_eq!(ex.glow.opacity, 0.0);
        assert!(ex.rings.iter().all(|r| r.opacity == 0.0));
        assert!(ex.secondary.iter().all(|s| s.opacity == 0.0));
        assert!(ex.sparks.iter().all(|s| s.opacity <= 0.25 + 1e-6));
        assert!((ex.center.y - (1.0 + 30.0 - 60.0)).abs() < 1e-3);
    }

    #[test]
    fn secondary_sparks_wait_for_delay() {
        let fw = firework();
        // u = 0.1: before every delay.
        let p = 0.75 + 0.25 * (0.5 + 0.5 * 0.1);
        let FireworkState::Explosion(ex) = fw.evaluate(p, 0.0) else {
            panic!("expected explosion");
        };
        assert!(ex.secondary.iter().all(|s| !s.visible));
        assert!(ex.rings[0].visible);
        assert!(!ex.rings[2].visible);
    }

    #[test]
    fn spark_opacity_decays_with_time() {
        let fw = firework();
        let at = |u: f32| match fw.evaluate(0.75 + 0.25 * (0.5 + 0.5 * u), 0.0) {
            FireworkState::Explosion(ex) => ex.sparks[0].opacity,
            _ => panic!("expected explosion"),
        };
        assert!(at(0.1) > at(0.3));
        assert!(at(0.3) > at(0.5));
    }

    #[test]
    fn focus_follows_rocket_then_holds() {
        let fw = firework();
        assert_eq!(fw.focus_point(0.5), Vec3::new(7.0, 1.0, -11.0));
        assert!(fw.focus_point(0.8).y > 1.0);
        assert!((fw.focus_point(0.95).y - 31.0).abs() < 1e-4);
    }
}
