//! Character animation binding.
//!
//! Clips are authored against a canonical rig (`RightHand`, `LeftUpLeg`, ...)
//! while an instanced skeleton carries numeric duplication suffixes
//! (`LeftUpLeg_057`). Track names are retargeted onto instance bones before
//! sampling.
//!
//! A scroll-controlled character scrubs its clip to `progress × duration`
//! every frame; other characters loop on wall time. Until both the skeleton
//! and the clip have arrived, a binding produces no pose.

use std::collections::{BTreeMap, HashMap};

use anyhow::ensure;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::math::{clamp_unit, Euler, Vec3};

/// Bone names of a skinned mesh instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Skeleton {
    pub bones: Vec<String>,
}

/// Strips a trailing `_<digits>` duplication suffix.
pub fn canonical_bone_name(name: &str) -> &str {
    match name.rfind('_') {
        Some(idx)
            if idx + 1 < name.len() && name[idx + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &name[..idx]
        }
        _ => name,
    }
}

/// Canonical bone name → instance bone name.
#[derive(Debug, Clone, Default)]
pub struct BoneMap {
    map: HashMap<String, String>,
}

impl BoneMap {
    pub fn from_skeleton(skeleton: &Skeleton) -> Self {
        let map = skeleton
            .bones
            .iter()
            .map(|b| (canonical_bone_name(b).to_string(), b.clone()))
            .collect();
        Self { map }
    }

    pub fn resolve(&self, canonical: &str) -> Option<&str> {
        self.map.get(canonical).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Rewrites `mixamorig:Hips.position` style names onto instance bones.
/// Unknown bones keep their stripped canonical name.
pub fn retarget_track_name(name: &str, bones: &BoneMap) -> String {
    let stripped = name.replace("mixamorig:", "").replace("mixamorig", "");
    match stripped.split_once('.') {
        Some((bone, property)) => match bones.resolve(bone) {
            Some(instance) => format!("{instance}.{property}"),
            None => stripped,
        },
        None => stripped,
    }
}

/// Keyframes for one animated property. `values` holds `stride` floats per
/// key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyframeTrack {
    pub name: String,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl KeyframeTrack {
    pub fn stride(&self) -> usize {
        if self.times.is_empty() {
            0
        } else {
            self.values.len() / self.times.len()
        }
    }

    fn key(&self, idx: usize) -> &[f32] {
        let s = self.stride();
        &self.values[idx * s..(idx + 1) * s]
    }

    /// Linear sample; quaternion tracks are normalized after blending.
    pub fn sample(&self, time: f32) -> Vec<f32> {
        let n = self.times.len();
        if n == 0 {
            return Vec::new();
        }
        if time <= self.times[0] {
            return self.key(0).to_vec();
        }
        if time >= self.times[n - 1] {
            return self.key(n - 1).to_vec();
        }

        let hi = self.times.partition_point(|t| *t <= time).clamp(1, n - 1);
        let lo = hi - 1;
        let span = self.times[hi] - self.times[lo];
        let f = if span > 0.0 {
            (time - self.times[lo]) / span
        } else {
            0.0
        };
        let (a, b) = (self.key(lo), self.key(hi));

        let mut out: Vec<f32> = a.iter().zip(b).map(|(x, y)| x + (y - x) * f).collect();
        if self.name.ends_with(".quaternion") {
            let len = out.iter().map(|v| v * v).sum::<f32>().sqrt();
            if len > f32::EPSILON {
                out.iter_mut().for_each(|v| *v /= len);
            }
        }
        out
    }
}

/// Skeletal animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<KeyframeTrack>,
}

/// Sampled property values keyed by track name.
pub type Pose = BTreeMap<String, Vec<f32>>;

impl AnimationClip {
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.duration.is_finite() && self.duration >= 0.0,
            "clip '{}' has invalid duration {}",
            self.name,
            self.duration
        );
        for track in &self.tracks {
            ensure!(
                track.times.is_empty() || track.values.len() % track.times.len() == 0,
                "track '{}' has {} values for {} keys",
                track.name,
                track.values.len(),
                track.times.len()
            );
            ensure!(
                track.times.windows(2).all(|w| w[0] <= w[1]),
                "track '{}' has unsorted key times",
                track.name
            );
        }
        Ok(())
    }

    /// Returns a copy whose track names target instance bones.
    pub fn retargeted(&self, bones: &BoneMap) -> Self {
        Self {
            name: self.name.clone(),
            duration: self.duration,
            tracks: self
                .tracks
                .iter()
                .map(|t| KeyframeTrack {
                    name: retarget_track_name(&t.name, bones),
                    times: t.times.clone(),
                    values: t.values.clone(),
                })
                .collect(),
        }
    }

    /// Evaluates every track at `time`.
    pub fn sample(&self, time: f32) -> Pose {
        self.tracks
            .iter()
            .map(|t| (t.name.clone(), t.sample(time)))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Clip time is `progress × duration`.
    ScrollControlled,
    /// Clip repeats on wall time.
    Looping,
}

/// Static prop to hang on a bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropAttachment {
    /// Canonical bone name.
    pub bone: String,
    pub offset: Vec3,
    pub rotation: Euler,
    pub scale: f32,
}

impl PropAttachment {
    /// The golf club placement in the right hand.
    pub fn golf_club() -> Self {
        Self {
            bone: "RightHand".to_string(),
            offset: Vec3::new(0.72, 0.43, 0.02),
            rotation: Euler::from_degrees(84.5, 35.7, 93.2),
            scale: 1.5,
        }
    }
}

/// A prop resolved onto an instance bone.
#[derive(Debug, Clone, PartialEq)]
pub struct AttachedProp {
    pub bone: String,
    pub offset: Vec3,
    pub rotation: Euler,
    pub scale: f32,
}

/// Per-frame output of a ready binding.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterFrame {
    pub time: f32,
    pub pose: Pose,
}

/// One character instance and its clip.
#[derive(Debug, Clone)]
pub struct CharacterBinding {
    name: String,
    mode: PlaybackMode,
    bones: Option<BoneMap>,
    source_clip: Option<AnimationClip>,
    clip: Option<AnimationClip>,
    prop: Option<PropAttachment>,
    attached: Option<AttachedProp>,
    clock: f32,
}

impl CharacterBinding {
    pub fn new(name: impl Into<String>, mode: PlaybackMode) -> Self {
        Self {
            name: name.into(),
            mode,
            bones: None,
            source_clip: None,
            clip: None,
            prop: None,
            attached: None,
            clock: 0.0,
        }
    }

    pub fn with_prop(mut self, prop: PropAttachment) -> Self {
        self.prop = Some(prop);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_ready(&self) -> bool {
        self.clip.is_some()
    }

    pub fn attached_prop(&self) -> Option<&AttachedProp> {
        self.attached.as_ref()
    }

    pub fn clip(&self) -> Option<&AnimationClip> {
        self.clip.as_ref()
    }

    /// Installs the instance skeleton.
    pub fn set_skeleton(&mut self, skeleton: &Skeleton) {
        let bones = BoneMap::from_skeleton(skeleton);
        info!(character = %self.name, bones = bones.len(), "Skeleton bound");

        if let Some(prop) = &self.prop {
            match bones.resolve(&prop.bone) {
                Some(instance) => {
                    info!(character = %self.name, bone = instance, "Prop attached");
                    self.attached = Some(AttachedProp {
                        bone: instance.to_string(),
                        offset: prop.offset,
                        rotation: prop.rotation,
                        scale: prop.scale,
                    });
                }
                None => {
                    warn!(character = %self.name, bone = %prop.bone, "Prop bone not found");
                }
            }
        }

        self.bones = Some(bones);
        self.bind();
    }

    /// Installs the source clip.
    pub fn set_clip(&mut self, clip: AnimationClip) {
        self.source_clip = Some(clip);
        self.bind();
    }

    fn bind(&mut self) {
        let (Some(bones), Some(source)) = (&self.bones, &self.source_clip) else {
            return;
        };
        if bones.is_empty() {
            return;
        }
        let clip = source.retargeted(bones);
        info!(
            character = %self.name,
            clip = %clip.name,
            duration = clip.duration,
            "Character animation ready"
        );
        self.clip = Some(clip);
    }

    /// Clip time for this frame, or `None` if not ready.
    pub fn clip_time(&self, progress: f32) -> Option<f32> {
        let clip = self.clip.as_ref()?;
        Some(match self.mode {
            PlaybackMode::ScrollControlled => clamp_unit(progress) * clip.duration,
            PlaybackMode::Looping if clip.duration > 0.0 => self.clock % clip.duration,
            PlaybackMode::Looping => 0.0,
        })
    }

    /// Advances one frame and evaluates the skeleton.
    pub fn update(&mut self, progress: f32, dt: f32) -> Option<CharacterFrame> {
        if self.clip.is_none() {
            return None;
        }
        if self.mode == PlaybackMode::Looping {
            self.clock += dt.max(0.0);
        }
        let time = self.clip_time(progress)?;
        let pose = self.clip.as_ref()?.sample(time);
        Some(CharacterFrame { time, pose })
    }
}
