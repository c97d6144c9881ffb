//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the playback crates:
//! - Logging and tracing initialisation
//! - Configuration (host bridge injection and engine tuning)
//! - Typed playback events and the broadcast event bus
//!
//! ## Overview
//!
//! Nothing here touches audio directly. The crate fixes the conventions the
//! engine follows: how it is configured, how it logs, and how it announces
//! what happened.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use config::{CoreConfig, CoreConfigBuilder, EngineConfig};
pub use error::{Error, Result};
pub use events::{CoreEvent, EngineEvent, EventBus, EventSeverity, EventStream, PlaybackEvent};
