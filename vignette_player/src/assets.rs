//! Asynchronous character asset loading.
//!
//! Each character's skeleton and clip are fetched by a fire-and-forget task.
//! Results come back over a channel that the frame loop drains; nothing is
//! cancelled, retried or timed out.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info};
use vignette_core::character::{AnimationClip, Skeleton};

/// Everything one character needs before it can animate.
#[derive(Debug, Clone)]
pub struct CharacterAssets {
    pub skeleton: Skeleton,
    pub clip: AnimationClip,
}

/// Completion of one load task.
#[derive(Debug)]
pub struct AssetMessage {
    pub character: String,
    pub result: anyhow::Result<CharacterAssets>,
}

#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load_character(&self, character: &str) -> anyhow::Result<CharacterAssets>;
}

/// Reads `<root>/<character>/skeleton.json` and `<root>/<character>/clip.json`.
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetLoader for FsAssetLoader {
    async fn load_character(&self, character: &str) -> anyhow::Result<CharacterAssets> {
        let dir = self.root.join(character);

        let path = dir.join("skeleton.json");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        let skeleton: Skeleton =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;

        let path = dir.join("clip.json");
        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("read {}", path.display()))?;
        let clip: AnimationClip =
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))?;
        clip.validate()?;

        debug!(character, bones = skeleton.bones.len(), tracks = clip.tracks.len(), "Assets read");
        Ok(CharacterAssets { skeleton, clip })
    }
}

/// Spawns load tasks and collects their results.
pub struct AssetPipeline {
    runtime: Handle,
    loader: Arc<dyn AssetLoader>,
    tx: mpsc::UnboundedSender<AssetMessage>,
    rx: mpsc::UnboundedReceiver<AssetMessage>,
    in_flight: usize,
}

impl AssetPipeline {
    /// Binds the pipeline to the current tokio runtime.
    pub fn new(loader: Arc<dyn AssetLoader>) -> anyhow::Result<Self> {
        let runtime = Handle::try_current().context("asset loading needs a tokio runtime")?;
        let (tx, rx) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            loader,
            tx,
            rx,
            in_flight: 0,
        })
    }

    /// Starts loading a character on the bound runtime.
    pub fn request(&mut self, character: &str) {
        info!(character, "Loading character assets");
        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let character = character.to_string();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let result = loader.load_character(&character).await;
            // The receiver only goes away with the player.
            let _ = tx.send(AssetMessage { character, result });
        });
    }

    /// Returns every result that arrived since the last poll.
    pub fn poll(&mut self) -> Vec<AssetMessage> {
        let mut done = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            done.push(msg);
        }
        done
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_requires_a_runtime() {
        let err = AssetPipeline::new(Arc::new(FsAssetLoader::new("assets")))
            .err()
            .unwrap();
        assert!(format!("{err:#}").contains("tokio runtime"));
    }

    #[tokio::test]
    async fn fs_loader_reads_character_dir() {
        let root = std::env::temp_dir().join(format!("vignette_assets_{}", std::process::id()));
        let dir = root.join("golfer");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("skeleton.json"), r#"{"bones":["Hips_001","RightHand_112"]}"#)
            .await
            .unwrap();
        tokio::fs::write(
            dir.join("clip.json"),
            r#"{"name":"swing","duration":2.0,"tracks":[{"name":"mixamorigHips.position","times":[0.0,2.0],"values":[0,0,0,1,1,1]}]}"#,
        )
        .await
        .unwrap();

        let assets = FsAssetLoader::new(&root).load_character("golfer").await.unwrap();
        assert_eq!(assets.skeleton.bones.len(), 2);
        assert_eq!(assets.clip.duration, 2.0);

        let missing = FsAssetLoader::new(&root).load_character("nobody").await;
        assert!(missing.is_err());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
