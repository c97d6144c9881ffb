//! Executor utilities.
//!
//! On native targets we wrap Tokio so downstream crates never need to build a
//! runtime themselves. On `wasm32` the browser owns the event loop; only
//! immediately-ready futures can be driven synchronously.

#[cfg(not(target_arch = "wasm32"))]
pub use tokio::runtime::{Builder, Handle, Runtime};

/// Runs the provided future to completion on a throwaway current-thread runtime.
///
/// Intended for log sinks and other edges that are called from synchronous
/// code. Never call this from inside an async context.
#[cfg(not(target_arch = "wasm32"))]
pub fn block_on<F>(future: F) -> F::Output
where
    F: std::future::Future,
{
    Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("core_async::runtime::block_on: failed to build Tokio runtime")
        .block_on(future)
}

#[cfg(target_arch = "wasm32")]
pub use crate::wasm::runtime::block_on;

#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen_futures::spawn_local;
