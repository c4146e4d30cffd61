//! Timeline events and a small typed event bus.
//!
//! The player pushes what happened during a frame; whoever drives the loop
//! drains the queues once per frame.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::shatter::ShatterEvent;

/// Notable transitions of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimelineEvent {
    PhaseChanged { from: Phase, to: Phase, progress: f32 },
    CaptureTaken { frame_id: u64 },
    CaptureFailed,
    ShatterStarted,
    ShatterReset,
    AssetReady { character: String },
    AssetFailed { character: String, error: String },
}

impl TimelineEvent {
    /// Maps a shatter transition onto the timeline's vocabulary.
    pub fn from_shatter(event: ShatterEvent) -> Self {
        match event {
            ShatterEvent::Captured { frame_id } => Self::CaptureTaken { frame_id },
            ShatterEvent::CaptureFailed => Self::CaptureFailed,
            ShatterEvent::ExplosionStarted => Self::ShatterStarted,
            ShatterEvent::Reset => Self::ShatterReset,
        }
    }
}

/// Typed event bus.
#[derive(Default)]
pub struct EventBus {
    queues: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl EventBus {
    /// Pushes an event into the queue.
    pub fn push<E: 'static + Send + Sync>(&mut self, e: E) {
        let q = self
            .queues
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(Vec::<E>::new()));
        // Keys are the TypeId of the stored Vec's element type.
        if let Some(q) = q.downcast_mut::<Vec<E>>() {
            q.push(e);
        }
    }

    /// Drains all queued events of a type.
    pub fn drain<E: 'static + Send + Sync>(&mut self) -> Vec<E> {
        self.queues
            .remove(&TypeId::of::<E>())
            .and_then(|boxed| boxed.downcast::<Vec<E>>().ok())
            .map(|boxed| *boxed)
            .unwrap_or_default()
    }

    pub fn len<E: 'static + Send + Sync>(&self) -> usize {
        self.queues
            .get(&TypeId::of::<E>())
            .and_then(|q| q.downcast_ref::<Vec<E>>())
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queues_are_per_type() {
        let mut bus = EventBus::default();
        bus.push(TimelineEvent::ShatterReset);
        bus.push(TimelineEvent::CaptureTaken { frame_id: 3 });
        bus.push(7u32);
        assert_eq!(bus.len::<TimelineEvent>(), 2);

        let events = bus.drain::<TimelineEvent>();
        assert_eq!(events[0], TimelineEvent::ShatterReset);
        assert!(bus.drain::<TimelineEvent>().is_empty());
        assert_eq!(bus.drain::<u32>(), vec![7]);
    }

    #[test]
    fn shatter_events_map_one_to_one() {
        assert_eq!(
            TimelineEvent::from_shatter(ShatterEvent::Captured { frame_id: 9 }),
            TimelineEvent::CaptureTaken { frame_id: 9 }
        );
        assert_eq!(
            TimelineEvent::from_shatter(ShatterEvent::Reset),
            TimelineEvent::ShatterReset
        );
    }
}
