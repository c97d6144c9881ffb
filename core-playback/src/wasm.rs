//! WebAssembly bindings for core-playback
//!
//! Exposes [`AudioEngine`] to JavaScript. Async operations return promises;
//! rejections are `Error` objects whose `name` identifies the failure
//! (`"Superseded"`, `"LoadFailed"`, ...).

use crate::error::PlaybackError;
use crate::types::Subscription;
use crate::{AudioEngine, EngineConfig};
use bridge_traits::media::MediaEventKind;
use bridge_wasm::WebAudioBackend;
use core_async::time::secs_f64;
use core_runtime::events::PlaybackEvent;
use js_sys::{Function, Promise};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

// Set up panic hook for better error messages in the browser
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn error_name(err: &PlaybackError) -> &'static str {
    match err {
        PlaybackError::NotInitialized(_) => "NotInitialized",
        PlaybackError::Destroyed => "Destroyed",
        PlaybackError::InvalidSource(_) => "InvalidSource",
        PlaybackError::LoadFailed { .. } => "LoadFailed",
        PlaybackError::LoadTimeout { .. } => "LoadTimeout",
        PlaybackError::Superseded(_) => "Superseded",
        PlaybackError::PlaybackFailed(_) => "PlaybackFailed",
        PlaybackError::NoTrackLoaded => "NoTrackLoaded",
        PlaybackError::Cancelled => "Cancelled",
        PlaybackError::InvalidVolume(_) => "InvalidVolume",
        PlaybackError::InvalidPlaybackRate { .. } => "InvalidPlaybackRate",
        PlaybackError::InvalidSeek(_) => "InvalidSeek",
        PlaybackError::InvalidDuration(_) => "InvalidDuration",
        PlaybackError::Bridge(_) => "BridgeError",
        PlaybackError::Config(_) => "ConfigError",
    }
}

fn to_js_error(err: PlaybackError) -> JsValue {
    let js_error = js_sys::Error::new(&err.to_string());
    js_error.set_name(error_name(&err));
    js_error.into()
}

fn unit(result: crate::Result<()>) -> Result<JsValue, JsValue> {
    result.map(|_| JsValue::UNDEFINED).map_err(to_js_error)
}

/// JavaScript-accessible engine configuration
#[wasm_bindgen]
#[derive(Clone, Default)]
pub struct JsEngineConfig {
    inner: EngineConfig,
}

#[wasm_bindgen]
impl JsEngineConfig {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    #[wasm_bindgen(js_name = setFftSize)]
    pub fn set_fft_size(&mut self, fft_size: u32) {
        self.inner.fft_size = fft_size;
    }

    #[wasm_bindgen(js_name = setSmoothing)]
    pub fn set_smoothing(&mut self, smoothing: f64) {
        self.inner.smoothing_time_constant = smoothing;
    }

    #[wasm_bindgen(js_name = setInitialVolume)]
    pub fn set_initial_volume(&mut self, volume: f32) {
        self.inner.initial_volume = volume;
    }

    #[wasm_bindgen(js_name = setVolumeRampMs)]
    pub fn set_volume_ramp_ms(&mut self, ms: f64) {
        self.inner.volume_ramp = secs_f64(ms / 1000.0);
    }

    /// `0` or a negative value disables the load timeout.
    #[wasm_bindgen(js_name = setLoadTimeoutMs)]
    pub fn set_load_timeout_ms(&mut self, ms: f64) {
        self.inner.load_timeout = (ms > 0.0).then(|| secs_f64(ms / 1000.0));
    }
}

/// JavaScript-facing audio engine backed by `HTMLAudioElement` and Web Audio.
#[wasm_bindgen]
pub struct JsAudioEngine {
    engine: AudioEngine,
    subscriptions: RefCell<HashMap<u32, Subscription>>,
    next_subscription: Cell<u32>,
}

#[wasm_bindgen]
impl JsAudioEngine {
    /// Never throws. Without Web Audio the engine is inert and its
    /// operations reject with `NotInitialized`.
    #[wasm_bindgen(constructor)]
    pub fn new(config: Option<JsEngineConfig>) -> Self {
        let config = config.map(|c| c.inner).unwrap_or_default();
        Self {
            engine: AudioEngine::new(config, Arc::new(WebAudioBackend::new())),
            subscriptions: RefCell::new(HashMap::new()),
            next_subscription: Cell::new(0),
        }
    }

    pub fn load(&self, url: String) -> Promise {
        let engine = self.engine.clone();
        future_to_promise(async move { unit(engine.load(&url).await) })
    }

    pub fn play(&self) -> Promise {
        let engine = self.engine.clone();
        future_to_promise(async move { unit(engine.play().await) })
    }

    pub fn pause(&self) -> Result<(), JsValue> {
        self.engine.pause().map_err(to_js_error)
    }

    pub fn stop(&self) -> Result<(), JsValue> {
        self.engine.stop().map_err(to_js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn position(&self) -> f64 {
        self.engine.position()
    }

    pub fn seek(&self, secs: f64) -> Result<f64, JsValue> {
        self.engine.seek(secs).map_err(to_js_error)
    }

    #[wasm_bindgen(getter)]
    pub fn duration(&self) -> f64 {
        self.engine.duration()
    }

    #[wasm_bindgen(getter)]
    pub fn volume(&self) -> f32 {
        self.engine.volume()
    }

    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, volume: f32) -> Result<(), JsValue> {
        self.engine.set_volume(volume).map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = getFrequencyData)]
    pub fn frequency_data(&self) -> Vec<u8> {
        self.engine.frequency_data()
    }

    #[wasm_bindgen(js_name = getWaveformData)]
    pub fn waveform_data(&self) -> Vec<u8> {
        self.engine.waveform_data()
    }

    #[wasm_bindgen(js_name = setPlaybackRate)]
    pub fn set_playback_rate(&self, rate: f64) -> Result<(), JsValue> {
        self.engine.set_playback_rate(rate).map_err(to_js_error)
    }

    pub fn crossfade(&self, url: String, duration_ms: f64) -> Promise {
        let engine = self.engine.clone();
        future_to_promise(async move {
            if !duration_ms.is_finite() || duration_ms < 0.0 {
                return Err(to_js_error(PlaybackError::InvalidDuration(duration_ms)));
            }
            unit(engine.crossfade(&url, secs_f64(duration_ms / 1000.0)).await)
        })
    }

    #[wasm_bindgen(js_name = cancelCrossfade)]
    pub fn cancel_crossfade(&self) -> bool {
        self.engine.cancel_crossfade()
    }

    /// Session snapshot, or `null` when inert or destroyed.
    #[wasm_bindgen(js_name = getAudioInfo)]
    pub fn audio_info(&self) -> Result<JsValue, JsValue> {
        match self.engine.audio_info() {
            Some(info) => serde_wasm_bindgen::to_value(&info)
                .map_err(|e| JsValue::from_str(&e.to_string())),
            None => Ok(JsValue::NULL),
        }
    }

    #[wasm_bindgen(js_name = isPlaying)]
    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    pub fn state(&self) -> String {
        self.engine.state().to_string()
    }

    /// Subscribe `callback` to a media event (`"canplay"`, `"timeupdate"`, ...).
    /// Returns an id for [`off`](Self::off).
    pub fn on(&self, event_name: &str, callback: Function) -> Result<u32, JsValue> {
        let kind: MediaEventKind = event_name
            .parse()
            .map_err(|e: bridge_traits::media::UnknownEventKind| JsValue::from_str(&e.to_string()))?;

        let listener = Arc::new(move |event: &PlaybackEvent| {
            let payload = serde_wasm_bindgen::to_value(event).unwrap_or(JsValue::NULL);
            if let Err(err) = callback.call1(&JsValue::NULL, &payload) {
                tracing::warn!(error = ?err, "Event listener threw");
            }
        });
        let subscription = self.engine.subscribe(kind, listener);

        let id = self.next_subscription.get() + 1;
        self.next_subscription.set(id);
        self.subscriptions.borrow_mut().insert(id, subscription);
        Ok(id)
    }

    pub fn off(&self, id: u32) -> bool {
        match self.subscriptions.borrow_mut().remove(&id) {
            Some(subscription) => self.engine.unsubscribe(&subscription),
            None => false,
        }
    }

    pub fn destroy(&self) -> Promise {
        self.subscriptions.borrow_mut().clear();
        let engine = self.engine.clone();
        future_to_promise(async move {
            engine.destroy().await;
            Ok(JsValue::UNDEFINED)
        })
    }
}
