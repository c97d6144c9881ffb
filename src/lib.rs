//! Audio engine workspace facade.
//!
//! Re-exports the playback engine together with the runtime and bridge
//! crates it is built from, so host applications depend on one crate and
//! pick a platform with a feature flag.
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `wasm`  | Enables the JavaScript bindings and the Web Audio bridge |

pub use bridge_traits;
pub use core_playback;
pub use core_runtime;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub use bridge_wasm;

pub use core_playback::{
    AudioEngine, AudioInfo, EngineConfig, EngineState, PlaybackError, Subscription,
};
