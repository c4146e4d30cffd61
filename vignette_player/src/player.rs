//! Player implementation.
//!
//! The player maintains:
//! - The progress source, fed by queued wheel input and autoplay
//! - The timeline and its render surface
//! - Character asset loading
//! - The typed event bus, drained once per frame
//! - Console for debug commands

use std::sync::Arc;

use vignette_core::{
    character::{CharacterBinding, PlaybackMode, PropAttachment},
    config::TimelineConfig,
    console::{Console, CvarFlags, CvarValue},
    event::{EventBus, TimelineEvent},
    progress::ProgressSource,
    render::{FrameCapture, RenderBackend},
    timeline::{FrameSample, Timeline},
};
use tracing::{info, warn};

use crate::assets::{AssetLoader, AssetMessage, AssetPipeline};
use crate::input::{InputQueue, InputSummary, WheelEvent};

/// The character whose clip is scrubbed by progress.
pub const GOLFER: &str = "golfer";
/// A background character on a looping clip.
pub const SPECTATOR: &str = "spectator";

/// One frame's output plus the events it raised.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub input: InputSummary,
    pub sample: FrameSample,
    pub events: Vec<TimelineEvent>,
}

pub struct Player<R> {
    pub console: Console,
    progress: ProgressSource,
    timeline: Timeline,
    input: InputQueue,
    events: EventBus,
    assets: Option<AssetPipeline>,
    renderer: R,
    frame: u64,
    /// Wheel events rejected by the forward lock, since start.
    locked_wheel: u64,
    quit: bool,
}

impl<R: RenderBackend + FrameCapture> Player<R> {
    pub fn new(cfg: TimelineConfig, renderer: R) -> anyhow::Result<Self> {
        let progress = ProgressSource::new(cfg.scroll);
        let mut timeline = Timeline::new(cfg)?;
        timeline.add_character(
            CharacterBinding::new(GOLFER, PlaybackMode::ScrollControlled)
                .with_prop(PropAttachment::golf_club()),
        );
        timeline.add_character(CharacterBinding::new(SPECTATOR, PlaybackMode::Looping));

        let mut console = Console::new();
        Self::register_cvars(&mut console)?;

        Ok(Self {
            console,
            progress,
            timeline,
            input: InputQueue::default(),
            events: EventBus::default(),
            assets: None,
            renderer,
            frame: 0,
            locked_wheel: 0,
            quit: false,
        })
    }

    fn register_cvars(console: &mut Console) -> anyhow::Result<()> {
        console.register_cvar(
            "tl_autoplay",
            CvarValue::Bool(true),
            "Advance progress automatically past the forward lock",
            CvarFlags::NONE,
        )?;
        console.register_cvar(
            "tl_log_frames",
            CvarValue::Bool(false),
            "Log a summary of every frame",
            CvarFlags::DEBUG,
        )?;
        Ok(())
    }

    /// Starts loading every character's assets on the current tokio
    /// runtime. Fails when called outside one.
    pub fn load_assets(&mut self, loader: Arc<dyn AssetLoader>) -> anyhow::Result<()> {
        let mut pipeline = AssetPipeline::new(loader)?;
        for character in self.timeline.characters() {
            pipeline.request(character.name());
        }
        self.assets = Some(pipeline);
        Ok(())
    }

    pub fn progress(&self) -> f32 {
        self.progress.progress()
    }

    pub fn set_progress(&mut self, value: f32) {
        self.progress.set_progress(value);
    }

    pub fn push_wheel(&mut self, delta_y: f32) {
        self.input.push(WheelEvent { delta_y });
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn assets_pending(&self) -> usize {
        self.assets.as_ref().map_or(0, AssetPipeline::in_flight)
    }

    /// Runs one frame: input, autoplay, assets, evaluators, events.
    pub fn frame(&mut self, dt: f32) -> FrameReport {
        let input = self.input.apply(&mut self.progress);
        self.locked_wheel += input.locked as u64;
        if input.ignored > 0 {
            warn!(frame = self.frame, ignored = input.ignored, "Dropped non-finite wheel events");
        }
        if self.console.flag("tl_autoplay") {
            self.progress.tick_autoplay();
        }
        self.poll_assets();

        let sample = self
            .timeline
            .frame(self.progress.progress(), dt, &mut self.renderer);
        self.frame += 1;

        if let Some((from, to)) = sample.phase_change {
            self.events.push(TimelineEvent::PhaseChanged {
                from,
                to,
                progress: sample.progress,
            });
        }
        if let Some(event) = sample.shatter_event {
            self.events.push(TimelineEvent::from_shatter(event));
        }

        let events = self.events.drain::<TimelineEvent>();
        for event in &events {
            info!(frame = self.frame, ?event, "Timeline event");
        }
        if self.console.flag("tl_log_frames") {
            let s = sample.summary();
            info!(
                frame = self.frame,
                progress = s.progress,
                wheel_applied = input.applied,
                wheel_locked = input.locked,
                phase = %s.phase,
                firework = %s.firework,
                shatter = ?s.shatter,
                "Frame"
            );
        }

        FrameReport {
            input,
            sample,
            events,
        }
    }

    fn poll_assets(&mut self) {
        let Some(pipeline) = self.assets.as_mut() else {
            return;
        };
        for AssetMessage { character, result } in pipeline.poll() {
            let Some(binding) = self.timeline.character_mut(&character) else {
                warn!(character = %character, "Assets for unknown character");
                continue;
            };
            match result {
                Ok(assets) => {
                    binding.set_skeleton(&assets.skeleton);
                    binding.set_clip(assets.clip);
                    if binding.is_ready() {
                        self.events.push(TimelineEvent::AssetReady { character });
                    } else {
                        let error = "skeleton has no bones".to_string();
                        warn!(character = %character, error = %error, "Character not bound");
                        self.events.push(TimelineEvent::AssetFailed { character, error });
                    }
                }
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(character = %character, error = %error, "Asset load failed");
                    self.events.push(TimelineEvent::AssetFailed { character, error });
                }
            }
        }
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let line = line.trim();
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(&cmd) = tokens.first() else {
            return Ok(Vec::new());
        };

        match cmd {
            "status" => {
                let mut out = vec![
                    format!("Frame: {}", self.frame),
                    format!("Progress: {:.4}", self.progress.progress()),
                    format!("Phase: {}", self.timeline.phase()),
                    format!("Autoplay: {}", self.progress.is_autoplaying()),
                    format!("Wheel events locked: {}", self.locked_wheel),
                    format!("Shatter: {:?}", self.timeline.shatter().phase()),
                ];
                for c in self.timeline.characters() {
                    out.push(format!("Character {}: ready={}", c.name(), c.is_ready()));
                }
                out.push(format!("Assets in flight: {}", self.assets_pending()));
                Ok(out)
            }
            "progress" => {
                let Some(value) = tokens.get(1) else {
                    return Ok(vec![format!("Progress: {:.4}", self.progress.progress())]);
                };
                let value: f32 = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("usage: progress <0..1>"))?;
                self.progress.set_progress(value);
                Ok(vec![format!("Progress: {:.4}", self.progress.progress())])
            }
            "wheel" => {
                let delta: f32 = tokens
                    .get(1)
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| anyhow::anyhow!("usage: wheel <deltaY>"))?;
                self.push_wheel(delta);
                Ok(vec![format!("Queued wheel {}", delta)])
            }
            "quit" | "exit" => {
                self.quit = true;
                Ok(vec!["Bye".to_string()])
            }
            _ => self.console.exec(line),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vignette_core::phase::Phase;
    use vignette_core::render::NullRenderer;

    fn player() -> Player<NullRenderer> {
        Player::new(TimelineConfig::default(), NullRenderer::default()).unwrap()
    }

    #[test]
    fn wheel_then_autoplay_order() {
        let mut p = player();
        p.set_progress(0.7499);
        p.push_wheel(10.0);
        p.frame(1.0 / 60.0);
        // Wheel moved past the lock first, so autoplay ran in the same frame.
        assert!((p.progress() - (0.7499 + 0.0015 + 0.0004)).abs() < 1e-5);
    }

    #[test]
    fn autoplay_can_be_disabled() {
        let mut p = player();
        p.set_progress(0.8);
        p.exec_console("tl_autoplay 0").unwrap();
        p.frame(0.016);
        assert_eq!(p.progress(), 0.8);
    }

    #[test]
    fn phase_events_are_drained_per_frame() {
        let mut p = player();
        p.set_progress(0.5);
        let report = p.frame(0.016);
        assert_eq!(
            report.events,
            vec![TimelineEvent::PhaseChanged {
                from: Phase::Idle,
                to: Phase::Flight,
                progress: 0.5
            }]
        );
        assert!(p.frame(0.016).events.is_empty());
    }

    #[test]
    fn locked_wheel_events_are_reported() {
        let mut p = player();
        p.exec_console("tl_autoplay 0").unwrap();
        p.set_progress(0.8);
        p.push_wheel(120.0);
        p.push_wheel(120.0);
        p.push_wheel(f32::NAN);
        let report = p.frame(0.016);
        assert_eq!(report.input.locked, 2);
        assert_eq!(report.input.ignored, 1);
        assert_eq!(p.progress(), 0.8);
        assert_eq!(p.exec_console("status").unwrap()[4], "Wheel events locked: 2");
    }

    #[test]
    fn loading_assets_outside_a_runtime_fails() {
        struct NoAssets;

        #[async_trait::async_trait]
        impl AssetLoader for NoAssets {
            async fn load_character(
                &self,
                character: &str,
            ) -> anyhow::Result<crate::assets::CharacterAssets> {
                anyhow::bail!("no assets for {character}")
            }
        }

        let mut p = player();
        assert!(p.load_assets(Arc::new(NoAssets)).is_err());
        assert_eq!(p.assets_pending(), 0);
        p.frame(0.016);
    }

    #[test]
    fn console_commands() {
        let mut p = player();
        p.exec_console("progress 2").unwrap();
        assert_eq!(p.progress(), 1.0);
        assert!(p.exec_console("progress nope").is_err());
        p.exec_console("progress 0.1").unwrap();
        p.exec_console("wheel 1000").unwrap();
        p.frame(0.016);
        assert!((p.progress() - 0.25).abs() < 1e-5);
        assert_eq!(p.exec_console("status").unwrap()[2], "Phase: idle");
        p.exec_console("quit").unwrap();
        assert!(p.should_quit());
    }
}
