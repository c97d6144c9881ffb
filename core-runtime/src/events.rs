//! # Event Bus System
//!
//! Broadcasts playback events to any number of async consumers using
//! `tokio::sync::broadcast`. This is the channel-shaped companion of the
//! engine's per-kind callback registry: the same notifications flow through
//! both.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  notify   ┌─────────────┐  publish  ┌───────────┐  subscribe  ┌────────────┐
//! │ MediaElement ├──────────>│ AudioEngine ├──────────>│ EventBus  ├────────────>│ Subscriber │
//! └──────────────┘           └─────────────┘           └───────────┘             └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use bridge_traits::media::MediaEventKind;
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! let event = PlaybackEvent::new(MediaEventKind::Play).with_position(12.5);
//! bus.emit(CoreEvent::Playback(event.clone())).ok();
//!
//! assert_eq!(subscriber.recv().await.unwrap(), CoreEvent::Playback(event));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n` events.
//!   `timeupdate` fires several times a second, so slow consumers should
//!   filter early or size the buffer accordingly.
//! - **`RecvError::Closed`**: every sender has been dropped.
//!
//! Late subscribers do not receive earlier events.

use bridge_traits::media::{MediaErrorInfo, MediaEventKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::RecvError, error::SendError, Receiver};

/// Default capacity of the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Event Types
// ============================================================================

/// Root event type published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// A media notification re-emitted by the engine.
    Playback(PlaybackEvent),
    /// Engine-level lifecycle the media element does not report itself.
    Engine(EngineEvent),
}

impl CoreEvent {
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Engine(e) => e.description(),
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(e) => e.severity(),
            CoreEvent::Engine(e) => e.severity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Snapshot of the session taken when a media notification fired.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackEvent {
    pub kind: MediaEventKind,
    /// Elapsed seconds.
    pub position: f64,
    /// Total seconds, `0.0` until metadata is known.
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MediaErrorInfo>,
}

impl PlaybackEvent {
    pub fn new(kind: MediaEventKind) -> Self {
        Self {
            kind,
            position: 0.0,
            duration: 0.0,
            src: None,
            error: None,
        }
    }

    pub fn with_position(mut self, position: f64) -> Self {
        self.position = position;
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_src(mut self, src: Option<String>) -> Self {
        self.src = src;
        self
    }

    pub fn with_error(mut self, error: Option<MediaErrorInfo>) -> Self {
        self.error = error;
        self
    }

    pub fn description(&self) -> &str {
        match self.kind {
            MediaEventKind::LoadStart => "Media started loading",
            MediaEventKind::LoadedMetadata => "Media metadata loaded",
            MediaEventKind::CanPlay => "Media can start playing",
            MediaEventKind::CanPlayThrough => "Media can play through without buffering",
            MediaEventKind::Play => "Playback started",
            MediaEventKind::Pause => "Playback paused",
            MediaEventKind::Ended => "Playback reached the end",
            MediaEventKind::TimeUpdate => "Playback position changed",
            MediaEventKind::Waiting => "Playback stalled waiting for data",
            MediaEventKind::Error => "Media error",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self.kind {
            MediaEventKind::Error => EventSeverity::Error,
            MediaEventKind::Waiting => EventSeverity::Warning,
            MediaEventKind::TimeUpdate | MediaEventKind::LoadStart => EventSeverity::Debug,
            _ => EventSeverity::Info,
        }
    }
}

/// Engine lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum EngineEvent {
    LoadStarted {
        src: String,
        generation: u64,
    },
    LoadCompleted {
        src: String,
        duration: f64,
    },
    LoadFailed {
        src: String,
        message: String,
    },
    /// A newer load overtook this one before it became playable.
    LoadSuperseded {
        src: String,
    },
    CrossfadeStarted {
        to: String,
        duration_secs: f64,
    },
    CrossfadeCompleted {
        to: String,
    },
    CrossfadeCancelled {
        to: String,
    },
    CrossfadeFailed {
        to: String,
        message: String,
    },
    VolumeChanged {
        volume: f32,
    },
    PlaybackRateChanged {
        rate: f64,
    },
    Destroyed,
}

impl EngineEvent {
    pub fn description(&self) -> &str {
        match self {
            EngineEvent::LoadStarted { .. } => "Track load started",
            EngineEvent::LoadCompleted { .. } => "Track ready to play",
            EngineEvent::LoadFailed { .. } => "Track failed to load",
            EngineEvent::LoadSuperseded { .. } => "Track load superseded by a newer load",
            EngineEvent::CrossfadeStarted { .. } => "Crossfade started",
            EngineEvent::CrossfadeCompleted { .. } => "Crossfade completed",
            EngineEvent::CrossfadeCancelled { .. } => "Crossfade cancelled",
            EngineEvent::CrossfadeFailed { .. } => "Crossfade failed",
            EngineEvent::VolumeChanged { .. } => "Volume changed",
            EngineEvent::PlaybackRateChanged { .. } => "Playback rate changed",
            EngineEvent::Destroyed => "Engine destroyed",
        }
    }

    pub fn severity(&self) -> EventSeverity {
        match self {
            EngineEvent::LoadFailed { .. } | EngineEvent::CrossfadeFailed { .. } => {
                EventSeverity::Error
            }
            EngineEvent::LoadSuperseded { .. } | EngineEvent::CrossfadeCancelled { .. } => {
                EventSeverity::Warning
            }
            EngineEvent::VolumeChanged { .. } | EngineEvent::PlaybackRateChanged { .. } => {
                EventSeverity::Debug
            }
            _ => EventSeverity::Info,
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel. Cloning yields another handle to the same bus.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates an independent receiver of all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with optional filtering.
///
/// ```rust
/// use bridge_traits::media::MediaEventKind;
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(16);
/// let ended_only = EventStream::new(bus.subscribe()).filter(|event| {
///     matches!(event, CoreEvent::Playback(e) if e.kind == MediaEventKind::Ended)
/// });
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Restrict the stream to media notifications of one kind.
    pub fn only_kind(self, kind: MediaEventKind) -> Self {
        self.filter(move |event| matches!(event, CoreEvent::Playback(e) if e.kind == kind))
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::media::MediaErrorCode;

    fn timeupdate(position: f64) -> CoreEvent {
        CoreEvent::Playback(
            PlaybackEvent::new(MediaEventKind::TimeUpdate)
                .with_position(position)
                .with_duration(180.0),
        )
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(CoreEvent::Engine(EngineEvent::Destroyed)).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Engine(EngineEvent::LoadStarted {
            src: "track-a.mp3".to_string(),
            generation: 1,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 2);

        assert_eq!(sub1.recv().await.unwrap(), event);
        assert_eq!(sub2.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_event_stream_only_kind() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe()).only_kind(MediaEventKind::Ended);

        bus.emit(timeupdate(1.0)).ok();
        bus.emit(CoreEvent::Engine(EngineEvent::VolumeChanged { volume: 0.5 }))
            .ok();
        let ended = CoreEvent::Playback(PlaybackEvent::new(MediaEventKind::Ended));
        bus.emit(ended.clone()).ok();

        assert_eq!(stream.recv().await.unwrap(), ended);
        assert!(stream.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for i in 0..5 {
            bus.emit(timeupdate(i as f64)).ok();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_try_recv_reports_closed() {
        let bus = EventBus::new(4);
        let mut stream = EventStream::new(bus.subscribe());
        drop(bus);
        assert!(matches!(stream.try_recv(), Some(Err(RecvError::Closed))));
    }

    #[test]
    fn test_event_severity() {
        let error = CoreEvent::Playback(
            PlaybackEvent::new(MediaEventKind::Error)
                .with_error(Some(MediaErrorInfo::new(MediaErrorCode::Network, "offline"))),
        );
        assert_eq!(error.severity(), EventSeverity::Error);
        assert_eq!(timeupdate(3.0).severity(), EventSeverity::Debug);
        assert_eq!(
            CoreEvent::Engine(EngineEvent::CrossfadeCancelled {
                to: "b.mp3".to_string()
            })
            .severity(),
            EventSeverity::Warning
        );
        assert!(EventSeverity::Error > EventSeverity::Info);
    }

    #[test]
    fn test_event_description() {
        let event = CoreEvent::Playback(PlaybackEvent::new(MediaEventKind::CanPlay));
        assert_eq!(event.description(), "Media can start playing");
        assert_eq!(
            CoreEvent::Engine(EngineEvent::Destroyed).description(),
            "Engine destroyed"
        );
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = CoreEvent::Playback(
            PlaybackEvent::new(MediaEventKind::LoadedMetadata)
                .with_duration(215.5)
                .with_src(Some("track-a.mp3".to_string())),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Playback");
        assert_eq!(json["payload"]["kind"], "loadedmetadata");
        assert_eq!(json["payload"]["duration"], 215.5);
        assert!(json["payload"].get("error").is_none());

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_engine_event_tagging() {
        let json = serde_json::to_value(CoreEvent::Engine(EngineEvent::VolumeChanged {
            volume: 0.5,
        }))
        .unwrap();
        assert_eq!(json["type"], "Engine");
        assert_eq!(json["payload"]["event"], "VolumeChanged");
    }
}
