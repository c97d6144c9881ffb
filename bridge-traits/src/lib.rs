//! # Host Bridge Traits
//!
//! Capability contracts the playback core needs from its host.
//!
//! ## Overview
//!
//! The engine never touches a browser API directly. Everything it depends on
//! is described here as a trait and injected at construction time, so the same
//! engine runs against the browser (`bridge-wasm`) and against in-memory fakes
//! in tests.
//!
//! ## Traits
//!
//! ### Media & audio
//! - [`MediaElement`](media::MediaElement) - One playable resource with transport state and lifecycle notifications
//! - [`AudioGraph`](graph::AudioGraph) - Processing context with gain and analyser nodes
//! - [`AudioBackend`](graph::AudioBackend) - Acquires and wires both as an [`AudioHost`](graph::AudioHost)
//!
//! ### Utilities
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Web      | `bridge-wasm`       | ✅ Implemented |
//! | Desktop  | TBD                 | 📋 Planned |
//!
//! ## Fail-Fast Strategy
//!
//! A backend that cannot provide audio must say so from
//! [`AudioBackend::open`](graph::AudioBackend::open) with
//! [`BridgeError::NotAvailable`]. The engine then stays constructed but inert
//! instead of failing the whole application.
//!
//! ## Thread Safety
//!
//! Native builds require `Send + Sync` on every bridge. On `wasm32` the bounds
//! are relaxed (see [`platform`]) because browser objects are single-threaded.

pub mod error;
pub mod graph;
pub mod logging;
pub mod media;
pub mod platform;

pub use error::BridgeError;

pub use graph::{AudioBackend, AudioGraph, AudioHost, ContextState, GraphOptions};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use media::{
    MediaElement, MediaErrorCode, MediaErrorInfo, MediaEventHandler, MediaEventKind,
    MediaNotification, ReadyState, TimeRange,
};
