//! Runtime-agnostic async helpers for the playback core.
//!
//! The engine never talks to an executor directly. Everything it needs from
//! one (timers, deadlines, cooperative cancellation, a way to drive a future
//! to completion in tests and log sinks) goes through this crate:
//!
//! - Native targets use Tokio.
//! - `wasm32` targets use the browser event loop (`gloo-timers`,
//!   `wasm-bindgen-futures`) and single-threaded primitives.
//!
//! # Modules
//!
//! - `time`: `sleep`, `timeout`, `Duration`
//! - `sync`: `CancellationToken`
//! - `runtime`: `block_on` and the native runtime handle
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::CancellationToken;
//! use core_async::time::{timeout, Duration};
//!
//! async fn wait_for_fade(token: CancellationToken) -> bool {
//!     // `false` when the fade was interrupted or never finished.
//!     timeout(Duration::from_millis(500), token.cancelled()).await.is_err()
//! }
//! ```

pub mod runtime;
pub mod sync;
pub mod time;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use sync::CancellationToken;
pub use time::{sleep, timeout, Duration, TimeoutError};
