//! `vignette_player`
//!
//! Host-side systems around the timeline:
//! - Wheel input queueing
//! - Asynchronous character asset loading
//! - Frame loop, event draining and the debug console

pub mod assets;
pub mod input;
pub mod player;

pub use player::{FrameReport, Player};
