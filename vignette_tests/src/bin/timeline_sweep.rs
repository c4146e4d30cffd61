//! Timeline sweep.
//!
//! Samples progress uniformly from 0 to 1 through a headless player and
//! writes `timeline.json` for offline inspection of the tuned curves.
//!
//! Usage: `timeline_sweep [out_dir] [steps]`

use std::path::PathBuf;

use anyhow::{ensure, Context};
use serde::Serialize;
use tracing::info;
use vignette_core::config::TimelineConfig;
use vignette_core::event::TimelineEvent;
use vignette_core::render::NullRenderer;
use vignette_core::timeline::FrameSummary;
use vignette_player::Player;

#[derive(Serialize)]
struct SweepReport {
    steps: u32,
    config: TimelineConfig,
    samples: Vec<FrameSummary>,
    events: Vec<TimelineEvent>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let out_dir = args
        .get(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sweep-out"));
    let steps: u32 = match args.get(2) {
        Some(s) => s.parse().with_context(|| format!("steps: {s}"))?,
        None => 500,
    };
    ensure!(steps > 0, "steps must be positive");

    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create {}", out_dir.display()))?;

    let config = TimelineConfig::default();
    let mut player = Player::new(config.clone(), NullRenderer::default())?;
    player.exec_console("tl_autoplay 0")?;

    let mut samples = Vec::with_capacity(steps as usize + 1);
    let mut events = Vec::new();
    for i in 0..=steps {
        player.set_progress(i as f32 / steps as f32);
        let report = player.frame(1.0 / 60.0);
        samples.push(report.sample.summary());
        events.extend(report.events);
    }

    let report = SweepReport {
        steps,
        config,
        samples,
        events,
    };
    let path = out_dir.join("timeline.json");
    let json = serde_json::to_string_pretty(&report).context("serialize sweep")?;
    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;

    info!(
        samples = report.samples.len(),
        events = report.events.len(),
        path = %path.display(),
        "Sweep written"
    );
    Ok(())
}
