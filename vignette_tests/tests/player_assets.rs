//! Character asset loading through the player's frame loop.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use vignette_core::character::{AnimationClip, KeyframeTrack, Skeleton};
use vignette_core::config::TimelineConfig;
use vignette_core::event::TimelineEvent;
use vignette_core::render::NullRenderer;
use vignette_player::assets::{AssetLoader, CharacterAssets};
use vignette_player::player::{GOLFER, SPECTATOR};
use vignette_player::Player;

/// Serves assets from memory; unknown characters fail.
struct MemoryLoader {
    characters: HashMap<String, CharacterAssets>,
}

#[async_trait]
impl AssetLoader for MemoryLoader {
    async fn load_character(&self, character: &str) -> anyhow::Result<CharacterAssets> {
        tokio::task::yield_now().await;
        self.characters
            .get(character)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no assets for {character}"))
    }
}

fn golfer_assets() -> CharacterAssets {
    CharacterAssets {
        skeleton: Skeleton {
            bones: vec!["Hips_001".into(), "RightHand_112".into()],
        },
        clip: AnimationClip {
            name: "swing".into(),
            duration: 4.0,
            tracks: vec![KeyframeTrack {
                name: "mixamorig:Hips.position".into(),
                times: vec![0.0, 4.0],
                values: vec![0.0, 0.0, 0.0, 4.0, 8.0, 12.0],
            }],
        },
    }
}

async fn run_until_loaded(p: &mut Player<NullRenderer>) -> Vec<TimelineEvent> {
    let mut events = Vec::new();
    for _ in 0..100 {
        events.extend(p.frame(1.0 / 60.0).events);
        if p.assets_pending() == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    }
    events
}

#[tokio::test]
async fn ready_and_failed_loads_are_reported() -> anyhow::Result<()> {
    let mut p = Player::new(TimelineConfig::default(), NullRenderer::default())?;
    p.load_assets(Arc::new(MemoryLoader {
        characters: HashMap::from([(GOLFER.to_string(), golfer_assets())]),
    }))?;
    assert_eq!(p.assets_pending(), 2);

    let events = run_until_loaded(&mut p).await;
    assert_eq!(p.assets_pending(), 0);
    assert!(events.contains(&TimelineEvent::AssetReady {
        character: GOLFER.to_string()
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        TimelineEvent::AssetFailed { character, .. } if character == SPECTATOR
    )));

    let golfer = p
        .timeline()
        .characters()
        .iter()
        .find(|c| c.name() == GOLFER)
        .unwrap();
    assert!(golfer.is_ready());
    assert_eq!(golfer.attached_prop().unwrap().bone, "RightHand_112");

    // The failed character stays inert; the rest of the timeline runs.
    let spectator = p
        .timeline()
        .characters()
        .iter()
        .find(|c| c.name() == SPECTATOR)
        .unwrap();
    assert!(!spectator.is_ready());
    Ok(())
}

#[tokio::test]
async fn scroll_controlled_character_scrubs_with_progress() -> anyhow::Result<()> {
    let mut p = Player::new(TimelineConfig::default(), NullRenderer::default())?;
    p.load_assets(Arc::new(MemoryLoader {
        characters: HashMap::from([(GOLFER.to_string(), golfer_assets())]),
    }))?;
    run_until_loaded(&mut p).await;

    p.set_progress(0.5);
    let sample = p.frame(1.0 / 60.0).sample;
    let (_, frame) = sample
        .characters
        .iter()
        .find(|(name, _)| name == GOLFER)
        .unwrap();
    let frame = frame.as_ref().unwrap();
    assert_eq!(frame.time, 2.0);
    assert_eq!(frame.pose["Hips_001.position"], vec![2.0, 4.0, 6.0]);

    let (_, spectator) = sample
        .characters
        .iter()
        .find(|(name, _)| name == SPECTATOR)
        .unwrap();
    assert!(spectator.is_none());
    Ok(())
}

#[tokio::test]
async fn boneless_skeleton_is_reported_as_failed() -> anyhow::Result<()> {
    let mut assets = golfer_assets();
    assets.skeleton = Skeleton { bones: Vec::new() };
    let mut p = Player::new(TimelineConfig::default(), NullRenderer::default())?;
    p.load_assets(Arc::new(MemoryLoader {
        characters: HashMap::from([(GOLFER.to_string(), assets)]),
    }))?;

    let events = run_until_loaded(&mut p).await;
    assert!(!events.contains(&TimelineEvent::AssetReady {
        character: GOLFER.to_string()
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        TimelineEvent::AssetFailed { character, error }
            if character == GOLFER && error == "skeleton has no bones"
    )));

    let golfer = p
        .timeline()
        .characters()
        .iter()
        .find(|c| c.name() == GOLFER)
        .unwrap();
    assert!(!golfer.is_ready());
    Ok(())
}
