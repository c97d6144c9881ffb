//! Snapshot and handle types exposed by the engine.

use bridge_traits::media::{MediaEventKind, ReadyState, TimeRange};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Point-in-time view of the playback session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioInfo {
    pub src: Option<String>,
    /// Elapsed seconds.
    pub position: f64,
    /// Total seconds; `0.0` until metadata is known.
    pub duration: f64,
    /// Target volume, `0.0..=1.0`.
    pub volume: f32,
    pub paused: bool,
    pub ended: bool,
    pub ready_state: ReadyState,
    pub buffered: Vec<TimeRange>,
    pub playback_rate: f64,
}

impl AudioInfo {
    /// Fraction of the track played, `0.0..=1.0`. `0.0` while duration is unknown.
    pub fn progress(&self) -> f64 {
        if self.duration > 0.0 {
            (self.position / self.duration).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Coarse lifecycle of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// The host could not provide audio; every operation fails.
    Uninitialized,
    /// Nothing loaded yet.
    Idle,
    Loading,
    /// Playable and not yet started.
    Ready,
    Playing,
    Paused,
    Ended,
    /// The last load or the media itself failed. A new `load` recovers.
    Error,
    Destroyed,
}

impl EngineState {
    /// A source is loaded and transport controls apply.
    pub fn has_track(self) -> bool {
        matches!(
            self,
            EngineState::Ready | EngineState::Playing | EngineState::Paused | EngineState::Ended
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, EngineState::Uninitialized | EngineState::Destroyed)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineState::Uninitialized => "uninitialized",
            EngineState::Idle => "idle",
            EngineState::Loading => "loading",
            EngineState::Ready => "ready",
            EngineState::Playing => "playing",
            EngineState::Paused => "paused",
            EngineState::Ended => "ended",
            EngineState::Error => "error",
            EngineState::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Opaque id of one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Handle returned by `subscribe`; pass it to `unsubscribe` to remove the
/// listener. Dropping it does not unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub kind: MediaEventKind,
}
