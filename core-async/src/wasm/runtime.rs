//! `block_on` for the browser.
//!
//! The browser cannot block its main thread. This drives a future on a
//! `LocalPool`, which only terminates for futures that never wait on a browser
//! API (timers, promises, fetch). Log sinks are the only caller.

use std::future::Future;

/// Drives an immediately-ready future to completion.
///
/// Hangs if `future` awaits anything scheduled by the browser event loop; use
/// `spawn_local` for those.
pub fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    futures::executor::LocalPool::new().run_until(future)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn block_on_drives_ready_futures() {
        assert_eq!(block_on(futures::future::ready(3)), 3);
    }
}
