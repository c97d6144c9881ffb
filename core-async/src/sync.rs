//! Cooperative cancellation.
//!
//! Long-running engine sequences (a crossfade, a pending load) hold a
//! [`CancellationToken`] and race every await point against
//! [`CancellationToken::cancelled`]. Whoever starts a newer sequence cancels the
//! token of the older one.
//!
//! - Native: re-export of `tokio_util::sync::CancellationToken` (`Send + Sync`).
//! - WASM: a single-threaded token with the same method names.

#[cfg(not(target_arch = "wasm32"))]
pub use tokio_util::sync::CancellationToken;

#[cfg(target_arch = "wasm32")]
pub use crate::wasm::cancellation_token::CancellationToken;
