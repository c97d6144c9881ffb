//! # Playback Error Types
//!
//! Error types for audio engine operations.

use bridge_traits::error::BridgeError;
use bridge_traits::media::MediaErrorInfo;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The host could not provide a media element or processing graph.
    #[error("Audio engine not initialized: {0}")]
    NotInitialized(String),

    /// The engine was destroyed before or while the operation ran.
    #[error("Audio engine destroyed")]
    Destroyed,

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The URL is empty or otherwise unusable.
    #[error("Invalid audio source: {0}")]
    InvalidSource(String),

    /// The media element reported an error while loading.
    #[error("Failed to load {src}: {reason}")]
    LoadFailed {
        src: String,
        reason: String,
        media_error: Option<MediaErrorInfo>,
    },

    /// The media did not become playable within the configured timeout.
    #[error("Timed out loading {src} after {timeout_ms} ms")]
    LoadTimeout { src: String, timeout_ms: u64 },

    /// A newer `load` started before this one became playable.
    #[error("Load of {0} superseded by a newer load")]
    Superseded(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// The host refused to start playback (autoplay policy, decode error).
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// Attempted operation when no track is loaded.
    #[error("No track loaded")]
    NoTrackLoaded,

    /// The operation was cancelled by a later crossfade or load.
    #[error("Operation cancelled")]
    Cancelled,

    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// Invalid volume value (must be in range [0.0, 1.0]).
    #[error("Invalid volume: {0} (must be between 0.0 and 1.0)")]
    InvalidVolume(f32),

    #[error("Invalid playback rate: {rate} (must be between {min} and {max})")]
    InvalidPlaybackRate { rate: f64, min: f64, max: f64 },

    #[error("Invalid seek position: {0}")]
    InvalidSeek(f64),

    #[error("Invalid crossfade duration: {0}")]
    InvalidDuration(f64),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),
}

impl PlaybackError {
    /// Returns `true` when the operation lost a race with a newer one rather
    /// than failing on its own.
    pub fn is_stale(&self) -> bool {
        matches!(self, PlaybackError::Superseded(_) | PlaybackError::Cancelled)
    }

    /// Returns `true` if a user action (a click, a different track, a value
    /// within range) can resolve this error.
    pub fn is_user_actionable(&self) -> bool {
        match self {
            PlaybackError::PlaybackFailed(_)
            | PlaybackError::NoTrackLoaded
            | PlaybackError::InvalidSource(_)
            | PlaybackError::InvalidVolume(_)
            | PlaybackError::InvalidPlaybackRate { .. }
            | PlaybackError::InvalidSeek(_)
            | PlaybackError::InvalidDuration(_)
            | PlaybackError::LoadFailed { .. } => true,
            PlaybackError::Bridge(err) => err.is_permission_denied(),
            _ => false,
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
