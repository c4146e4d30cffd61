//! Headless player binary.
//!
//! Usage:
//!   cargo run -p vignette_player -- [--config timeline.json] [--fps 60] [--frames 0] [--assets assets]
//!
//! Runs the timeline on a null render surface. `--frames 0` runs until `quit`.
//!
//! Console commands:
//!   status              - Show player status
//!   progress [v]        - Show or set progress
//!   wheel <deltaY>      - Queue a wheel event
//!   cvarlist            - List cvars (tl_autoplay, tl_log_frames)
//!   quit                - Exit player

use std::env;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::info;
use vignette_core::{config::TimelineConfig, render::NullRenderer};
use vignette_player::{assets::FsAssetLoader, Player};

struct Args {
    config: Option<PathBuf>,
    fps: u32,
    frames: u64,
    assets: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut out = Args {
        config: None,
        fps: 60,
        frames: 0,
        assets: None,
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--fps" if i + 1 < args.len() => {
                out.fps = args[i + 1].parse().context("--fps")?;
                i += 2;
            }
            "--frames" if i + 1 < args.len() => {
                out.frames = args[i + 1].parse().context("--frames")?;
                i += 2;
            }
            "--assets" if i + 1 < args.len() => {
                out.assets = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            _ => i += 1,
        }
    }
    anyhow::ensure!(out.fps > 0, "--fps must be positive");
    Ok(out)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args()?;
    let cfg = match &args.config {
        Some(path) => TimelineConfig::load(path)?,
        None => TimelineConfig::default(),
    };
    info!(fps = args.fps, frames = args.frames, "Starting player");

    let mut player = Player::new(cfg, NullRenderer::default()).context("build player")?;
    if let Some(root) = &args.assets {
        player.load_assets(Arc::new(FsAssetLoader::new(root)))?;
    }

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("Player running. Type 'help' for commands, 'quit' to exit.");
    println!();

    let frame_time = Duration::from_secs_f32(1.0 / args.fps as f32);
    let mut interval = tokio::time::interval(frame_time);
    loop {
        interval.tick().await;

        while let Ok(line) = console_rx.try_recv() {
            match player.exec_console(&line) {
                Ok(output) => {
                    for line in output {
                        println!("{}", line);
                    }
                }
                Err(e) => {
                    println!("Error: {:#}", e);
                }
            }
        }
        if player.should_quit() {
            break;
        }

        player.frame(frame_time.as_secs_f32());

        if args.frames > 0 && player.frames() >= args.frames {
            break;
        }
    }

    info!(
        frames = player.frames(),
        progress = player.progress(),
        phase = %player.timeline().phase(),
        "Player stopped"
    );
    Ok(())
}
