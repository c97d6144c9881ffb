//! WebAssembly Bridge Implementations
//!
//! Browser implementations of the `bridge-traits` audio contracts, built on
//! `web-sys` and `wasm-bindgen`.
//!
//! # Platform Support
//!
//! This crate is designed exclusively for the `wasm32-unknown-unknown` target.
//! It will not compile for native targets.
//!
//! # Implementations
//!
//! - `WebMediaElement`: `HTMLAudioElement` with DOM event forwarding
//! - `WebAudioGraph`: `AudioContext` with a gain → analyser chain
//! - `WebAudioBackend`: opens both and wires the element into the graph
//!
//! # Examples
//!
//! ```ignore
//! use bridge_wasm::WebAudioBackend;
//! use core_playback::{AudioEngine, EngineConfig};
//! use std::sync::Arc;
//!
//! let engine = AudioEngine::new(EngineConfig::default(), Arc::new(WebAudioBackend::new()));
//! engine.load("/audio/intro.mp3").await?;
//! engine.play().await?;
//! ```

#![cfg(target_arch = "wasm32")]
#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod media;

// Re-export commonly used types
pub use error::{WasmError, WasmResult};
pub use graph::{WebAudioBackend, WebAudioGraph};
pub use media::WebMediaElement;
