//! `HTMLAudioElement` implementation of [`MediaElement`].
//!
//! One DOM listener is registered per [`MediaEventKind`] when the element is
//! created; each forwards to whatever [`MediaEventHandler`] is installed at
//! the time the event fires. The listeners are removed again on drop.

use crate::error::{js_error, WasmError};
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::media::{
    MediaElement, MediaErrorCode, MediaErrorInfo, MediaEventHandler, MediaEventKind,
    MediaNotification, ReadyState, TimeRange,
};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Event, HtmlAudioElement, HtmlMediaElement};

type HandlerSlot = Rc<RefCell<Option<MediaEventHandler>>>;

/// Media element backed by a detached `HTMLAudioElement`.
pub struct WebMediaElement {
    element: HtmlAudioElement,
    handler: HandlerSlot,
    listeners: Vec<(MediaEventKind, Closure<dyn FnMut(Event)>)>,
}

impl WebMediaElement {
    /// Creates an `Audio` element and attaches the DOM listeners.
    ///
    /// The element uses `crossOrigin = "anonymous"` so cross-origin sources
    /// served with CORS headers remain readable by the analyser.
    pub fn new() -> BridgeResult<Self> {
        let element = HtmlAudioElement::new().map_err(|err| {
            BridgeError::NotAvailable(format!("HTMLAudioElement: {}", WasmError::from(err)))
        })?;
        element.set_cross_origin(Some("anonymous"));
        element.set_preload("auto");

        let handler: HandlerSlot = Rc::new(RefCell::new(None));
        let mut listeners = Vec::with_capacity(MediaEventKind::ALL.len());

        for kind in MediaEventKind::ALL {
            let slot = Rc::clone(&handler);
            let media = element.clone();
            let callback = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
                let notification = match kind {
                    MediaEventKind::Error => MediaNotification::error(media_error_info(&media)),
                    other => MediaNotification::new(other),
                };
                // Release the borrow before calling out: the handler may
                // replace itself.
                let current = slot.borrow().clone();
                if let Some(handler) = current {
                    handler(notification);
                }
            });
            element
                .add_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref())
                .map_err(|err| js_error("add media listener", err))?;
            listeners.push((kind, callback));
        }

        debug!("Created HTMLAudioElement");
        Ok(Self {
            element,
            handler,
            listeners,
        })
    }

    /// The underlying element, for wiring into an `AudioContext`.
    pub fn element(&self) -> &HtmlMediaElement {
        &self.element
    }
}

fn media_error_info(element: &HtmlAudioElement) -> MediaErrorInfo {
    match element.error() {
        Some(error) => {
            let message = error.message();
            let code = MediaErrorCode::from_code(error.code());
            let message = if message.is_empty() {
                code.to_string()
            } else {
                message
            };
            MediaErrorInfo::new(code, message)
        }
        None => MediaErrorInfo::new(MediaErrorCode::Unknown, "media error"),
    }
}

#[async_trait(?Send)]
impl MediaElement for WebMediaElement {
    fn set_src(&self, url: &str) -> BridgeResult<()> {
        self.element.set_src(url);
        Ok(())
    }

    fn src(&self) -> Option<String> {
        let src = self.element.src();
        (!src.is_empty()).then_some(src)
    }

    fn load(&self) -> BridgeResult<()> {
        self.element.load();
        Ok(())
    }

    async fn play(&self) -> BridgeResult<()> {
        let promise = self
            .element
            .play()
            .map_err(|err| js_error("play", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| js_error("play", err))?;
        Ok(())
    }

    fn pause(&self) -> BridgeResult<()> {
        self.element.pause().map_err(|err| js_error("pause", err))
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn set_current_time(&self, secs: f64) -> BridgeResult<()> {
        self.element.set_current_time(secs);
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        let duration = self.element.duration();
        (duration.is_finite() && duration > 0.0).then_some(duration)
    }

    fn playback_rate(&self) -> f64 {
        self.element.playback_rate()
    }

    fn set_playback_rate(&self, rate: f64) -> BridgeResult<()> {
        self.element.set_playback_rate(rate);
        Ok(())
    }

    fn paused(&self) -> bool {
        self.element.paused()
    }

    fn ended(&self) -> bool {
        self.element.ended()
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_code(self.element.ready_state())
    }

    fn buffered(&self) -> Vec<TimeRange> {
        let ranges = self.element.buffered();
        (0..ranges.length())
            .filter_map(|i| Some(TimeRange::new(ranges.start(i).ok()?, ranges.end(i).ok()?)))
            .collect()
    }

    fn set_event_handler(&self, handler: Option<MediaEventHandler>) {
        *self.handler.borrow_mut() = handler;
    }

    fn release(&self) -> BridgeResult<()> {
        self.element.pause().map_err(|err| js_error("pause", err))?;
        self.element
            .remove_attribute("src")
            .map_err(|err| js_error("remove src", err))?;
        // Reloading with no source aborts any in-flight fetch.
        self.element.load();
        Ok(())
    }
}

impl Drop for WebMediaElement {
    fn drop(&mut self) {
        self.handler.borrow_mut().take();
        for (kind, callback) in &self.listeners {
            if let Err(err) = self
                .element
                .remove_event_listener_with_callback(kind.as_str(), callback.as_ref().unchecked_ref())
            {
                warn!(event = kind.as_str(), error = ?err, "Failed to remove media listener");
            }
        }
    }
}
