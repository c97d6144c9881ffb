//! # Playback Module
//!
//! The client-side audio engine: one media element, one processing graph,
//! transport controls, volume and rate, spectrum and waveform snapshots, a
//! cancellable crossfade, and per-kind event subscriptions.
//!
//! ## Overview
//!
//! The engine talks to the host only through the `bridge-traits` contracts
//! (`AudioBackend`, `MediaElement`, `AudioGraph`). In the browser those are
//! provided by `bridge-wasm`; tests use in-memory fakes.
//!
//! ```ignore
//! use core_playback::{AudioEngine, EngineConfig};
//! use bridge_traits::media::MediaEventKind;
//! use std::sync::Arc;
//!
//! let engine = AudioEngine::new(EngineConfig::default(), backend);
//! engine.subscribe(MediaEventKind::Ended, Arc::new(|event| {
//!     tracing::info!(src = ?event.src, "Track finished");
//! }));
//!
//! engine.load("https://cdn.example.com/track-a.mp3").await?;
//! engine.play().await?;
//! engine.crossfade("https://cdn.example.com/track-b.mp3", Duration::from_secs(3)).await?;
//! ```

pub mod crossfade;
pub mod engine;
pub mod error;
pub mod subscriptions;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core_runtime::config::EngineConfig;
pub use engine::AudioEngine;
pub use error::{PlaybackError, Result};
pub use subscriptions::Listener;
pub use types::{AudioInfo, EngineState, Subscription, SubscriptionId};
