//! Media element bridge.
//!
//! A [`MediaElement`] is the host's single playable audio resource: it owns the
//! transport state (source, position, rate, paused/ended flags, buffering) and
//! reports lifecycle notifications through one installed
//! [`MediaEventHandler`]. In a browser this is an `HTMLAudioElement`; tests use
//! in-memory fakes.
//!
//! Handlers may be invoked synchronously from inside a bridge call (for
//! example `load()` on a cached resource can report `canplay` before it
//! returns). Callers must not hold locks across bridge calls.

use crate::{error::Result, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// How much of the current resource is buffered, using the HTML media codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// No information about the resource.
    #[default]
    HaveNothing = 0,
    /// Duration and dimensions known; no frame data.
    HaveMetadata = 1,
    /// Data for the current position only.
    HaveCurrentData = 2,
    /// Enough data to advance a little past the current position.
    HaveFutureData = 3,
    /// Enough data to play through without stalling, at the current rate.
    HaveEnoughData = 4,
}

impl ReadyState {
    /// Maps a numeric `readyState` value; anything above 4 saturates.
    pub fn from_code(code: u16) -> Self {
        match code {
            0 => ReadyState::HaveNothing,
            1 => ReadyState::HaveMetadata,
            2 => ReadyState::HaveCurrentData,
            3 => ReadyState::HaveFutureData,
            _ => ReadyState::HaveEnoughData,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    /// Playback can start without immediately stalling.
    pub fn can_play(self) -> bool {
        self >= ReadyState::HaveFutureData
    }
}

/// A buffered interval of the resource, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, secs: f64) -> bool {
        secs >= self.start && secs <= self.end
    }
}

/// Lifecycle notifications a media element emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEventKind {
    LoadStart,
    LoadedMetadata,
    CanPlay,
    Play,
    Pause,
    Ended,
    TimeUpdate,
    Error,
    Waiting,
    CanPlayThrough,
}

impl MediaEventKind {
    /// Every kind, in the order a typical load-and-play emits them first.
    pub const ALL: [MediaEventKind; 10] = [
        MediaEventKind::LoadStart,
        MediaEventKind::LoadedMetadata,
        MediaEventKind::CanPlay,
        MediaEventKind::CanPlayThrough,
        MediaEventKind::Play,
        MediaEventKind::TimeUpdate,
        MediaEventKind::Waiting,
        MediaEventKind::Pause,
        MediaEventKind::Ended,
        MediaEventKind::Error,
    ];

    /// DOM event name.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaEventKind::LoadStart => "loadstart",
            MediaEventKind::LoadedMetadata => "loadedmetadata",
            MediaEventKind::CanPlay => "canplay",
            MediaEventKind::Play => "play",
            MediaEventKind::Pause => "pause",
            MediaEventKind::Ended => "ended",
            MediaEventKind::TimeUpdate => "timeupdate",
            MediaEventKind::Error => "error",
            MediaEventKind::Waiting => "waiting",
            MediaEventKind::CanPlayThrough => "canplaythrough",
        }
    }
}

impl fmt::Display for MediaEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown event name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEventKind(pub String);

impl fmt::Display for UnknownEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown media event: {}", self.0)
    }
}

impl std::error::Error for UnknownEventKind {}

impl FromStr for MediaEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', '_'], "");
        MediaEventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

/// `MediaError.code` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    SrcNotSupported,
    Unknown,
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => MediaErrorCode::Aborted,
            2 => MediaErrorCode::Network,
            3 => MediaErrorCode::Decode,
            4 => MediaErrorCode::SrcNotSupported,
            _ => MediaErrorCode::Unknown,
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaErrorCode::Aborted => "aborted",
            MediaErrorCode::Network => "network",
            MediaErrorCode::Decode => "decode",
            MediaErrorCode::SrcNotSupported => "src_not_supported",
            MediaErrorCode::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Error details attached to an `error` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaErrorInfo {
    pub code: MediaErrorCode,
    pub message: String,
}

impl MediaErrorInfo {
    pub fn new(code: MediaErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for MediaErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// A single notification delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaNotification {
    pub kind: MediaEventKind,
    /// Present only for [`MediaEventKind::Error`].
    pub error: Option<MediaErrorInfo>,
}

impl MediaNotification {
    pub fn new(kind: MediaEventKind) -> Self {
        Self { kind, error: None }
    }

    pub fn error(info: MediaErrorInfo) -> Self {
        Self {
            kind: MediaEventKind::Error,
            error: Some(info),
        }
    }
}

/// Callback installed on a media element.
#[cfg(not(target_arch = "wasm32"))]
pub type MediaEventHandler = Arc<dyn Fn(MediaNotification) + Send + Sync>;

/// Callback installed on a media element.
#[cfg(target_arch = "wasm32")]
pub type MediaEventHandler = Arc<dyn Fn(MediaNotification)>;

/// Host media element contract.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait MediaElement: PlatformSendSync {
    /// Assign the pending source. Does not start fetching on its own.
    fn set_src(&self, url: &str) -> Result<()>;

    /// Currently assigned source, resolved the way the host resolves it.
    fn src(&self) -> Option<String>;

    /// Start (or restart) resource selection for the assigned source.
    fn load(&self) -> Result<()>;

    /// Request playback; resolves once the host reports playback started.
    async fn play(&self) -> Result<()>;

    fn pause(&self) -> Result<()>;

    fn current_time(&self) -> f64;

    /// Seek. May move the element back to a buffering state.
    fn set_current_time(&self, secs: f64) -> Result<()>;

    /// Total length, once metadata is known and finite.
    fn duration(&self) -> Option<f64>;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64) -> Result<()>;

    fn paused(&self) -> bool;

    fn ended(&self) -> bool;

    fn ready_state(&self) -> ReadyState;

    fn buffered(&self) -> Vec<TimeRange>;

    /// Install (or with `None`, detach) the notification handler.
    fn set_event_handler(&self, handler: Option<MediaEventHandler>);

    /// Drop the source and stop any network activity.
    fn release(&self) -> Result<()>;
}
