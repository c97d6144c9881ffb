//! # Audio Engine
//!
//! One playback session: a single media element rendered through a single
//! processing graph (source → gain → analyser → output).
//!
//! ## Locking
//!
//! Session state sits behind one `parking_lot::Mutex`. The lock is never held
//! across a bridge call or an `.await`: hosts may deliver media notifications
//! synchronously from inside `set_src`, `load` or `pause`, and those
//! notifications re-enter the engine.
//!
//! ## Loads
//!
//! Every `load` bumps a generation counter and installs a pending-load slot
//! *before* touching the media element. The notification handler resolves
//! whatever slot is current; a newer `load` fails the older slot with
//! [`PlaybackError::Superseded`].

use crate::error::{PlaybackError, Result};
use crate::subscriptions::{Listener, ListenerRegistry};
use crate::types::{AudioInfo, EngineState, Subscription};
use bridge_traits::graph::{AudioBackend, AudioGraph, AudioHost, ContextState};
use bridge_traits::media::{
    MediaElement, MediaErrorInfo, MediaEventHandler, MediaEventKind, MediaNotification,
};
use core_async::sync::CancellationToken;
use core_async::time::{timeout, Duration};
use core_runtime::config::{CoreConfig, EngineConfig};
use core_runtime::events::{CoreEvent, EngineEvent, EventBus, EventStream, PlaybackEvent};
use core_runtime::logging::redact_url;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

/// Handle to an audio engine. Clones share the same session.
#[derive(Clone)]
pub struct AudioEngine {
    pub(crate) inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    /// `None` when the backend could not open a host; the engine is inert.
    pub(crate) host: Option<AudioHost>,
    init_error: Option<String>,
    pub(crate) session: Mutex<Session>,
    listeners: ListenerRegistry,
    events: EventBus,
}

pub(crate) struct Session {
    pub(crate) lifecycle: EngineState,
    generation: u64,
    pending_load: Option<PendingLoad>,
    pub(crate) crossfade: Option<ActiveCrossfade>,
    pub(crate) next_crossfade_id: u64,
    /// Target volume; the rendered gain may lag behind it during a ramp.
    pub(crate) volume: f32,
    pub(crate) destroyed: bool,
}

struct PendingLoad {
    generation: u64,
    src: String,
    resolve: oneshot::Sender<Result<()>>,
}

pub(crate) struct ActiveCrossfade {
    pub(crate) id: u64,
    pub(crate) to: String,
    pub(crate) token: CancellationToken,
}

impl AudioEngine {
    /// Opens a host through `backend` and wires the notification handler.
    ///
    /// Never fails: if the settings are invalid or the backend cannot open a
    /// host, the error is logged and the engine is inert. Fallible operations
    /// then return [`PlaybackError::NotInitialized`].
    pub fn new(config: EngineConfig, backend: Arc<dyn AudioBackend>) -> Self {
        Self::with_event_bus(config, backend, EventBus::default())
    }

    pub fn from_core_config(config: &CoreConfig) -> Self {
        Self::with_event_bus(
            config.engine.clone(),
            Arc::clone(&config.audio_backend),
            EventBus::new(config.event_buffer_size),
        )
    }

    /// Like [`AudioEngine::new`], publishing onto an existing bus.
    pub fn with_event_bus(
        config: EngineConfig,
        backend: Arc<dyn AudioBackend>,
        events: EventBus,
    ) -> Self {
        let opened = config
            .validate()
            .map_err(PlaybackError::from)
            .and_then(|_| {
                backend
                    .open(&config.graph_options())
                    .map_err(PlaybackError::from)
            });

        let (host, init_error, lifecycle) = match opened {
            Ok(host) => {
                info!(
                    backend = backend.name(),
                    fft_size = config.fft_size,
                    "Audio engine initialized"
                );
                (Some(host), None, EngineState::Idle)
            }
            Err(err) => {
                error!(backend = backend.name(), error = %err, "Audio engine initialization failed");
                (None, Some(err.to_string()), EngineState::Uninitialized)
            }
        };

        let inner = Arc::new(EngineInner {
            session: Mutex::new(Session {
                lifecycle,
                generation: 0,
                pending_load: None,
                crossfade: None,
                next_crossfade_id: 0,
                volume: config.initial_volume,
                destroyed: false,
            }),
            config,
            host,
            init_error,
            listeners: ListenerRegistry::new(),
            events,
        });

        if let Some(host) = &inner.host {
            let weak = Arc::downgrade(&inner);
            let handler: MediaEventHandler = Arc::new(move |notification: MediaNotification| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_notification(notification);
                }
            });
            host.media.set_event_handler(Some(handler));
        }

        Self { inner }
    }

    /// Assigns `url` and waits until the media can start playing.
    ///
    /// Cancels an in-flight crossfade. A second `load` before this one
    /// resolves makes this one fail with [`PlaybackError::Superseded`].
    pub async fn load(&self, url: &str) -> Result<()> {
        self.cancel_crossfade();
        self.inner.load_source(url).await
    }

    /// Resumes a suspended processing context, then starts playback.
    ///
    /// Resolves once the host reports playback started.
    pub async fn play(&self) -> Result<()> {
        self.inner.play_media().await
    }

    /// Pauses playback. A no-op when already paused, inert or destroyed.
    pub fn pause(&self) -> Result<()> {
        let Ok(host) = self.inner.host() else {
            return Ok(());
        };
        if host.media.paused() {
            return Ok(());
        }

        host.media.pause()?;
        self.inner.update_lifecycle(|state| match state {
            EngineState::Playing | EngineState::Ready => EngineState::Paused,
            other => other,
        });
        debug!("Playback paused");
        Ok(())
    }

    /// Pauses and rewinds to the start. The source stays loaded.
    pub fn stop(&self) -> Result<()> {
        let Ok(host) = self.inner.host() else {
            return Ok(());
        };

        if !host.media.paused() {
            host.media.pause()?;
        }
        if has_source(host.media.as_ref()) {
            host.media.set_current_time(0.0)?;
            self.inner.update_lifecycle(|state| match state {
                EngineState::Playing | EngineState::Ready | EngineState::Ended => {
                    EngineState::Paused
                }
                other => other,
            });
        }
        debug!("Playback stopped");
        Ok(())
    }

    /// Elapsed seconds; `0.0` when inert.
    pub fn position(&self) -> f64 {
        self.inner
            .host()
            .map_or(0.0, |host| finite_or_zero(host.media.current_time()))
    }

    /// Seeks to `secs`, clamped to the duration once it is known. Returns the
    /// position actually requested from the media.
    pub fn seek(&self, secs: f64) -> Result<f64> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(PlaybackError::InvalidSeek(secs));
        }
        let host = self.inner.host()?;
        if !has_source(host.media.as_ref()) {
            return Err(PlaybackError::NoTrackLoaded);
        }

        let duration = media_duration(host.media.as_ref());
        let target = if duration > 0.0 { secs.min(duration) } else { secs };
        host.media.set_current_time(target)?;
        // Seeking clears the element's ended flag.
        self.inner.update_lifecycle(|state| match state {
            EngineState::Ended => EngineState::Paused,
            other => other,
        });
        debug!(position = target, "Seek");
        Ok(target)
    }

    /// Total seconds once metadata is known, else `0.0`.
    pub fn duration(&self) -> f64 {
        self.inner.duration()
    }

    /// The volume most recently requested. `0.0` when inert.
    pub fn volume(&self) -> f32 {
        if self.inner.host().is_err() {
            return 0.0;
        }
        self.inner.session.lock().volume
    }

    /// Ramps the gain to `volume` over the configured ramp, starting from
    /// whatever the graph is rendering now.
    ///
    /// During a crossfade only the target is recorded; the fade-in ramps to it.
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
            return Err(PlaybackError::InvalidVolume(volume));
        }
        let host = self.inner.host()?;

        let fading = self.inner.session.lock().crossfade.is_some();
        if !fading {
            schedule_gain_ramp(host.graph.as_ref(), volume, self.inner.config.volume_ramp)?;
        }
        self.inner.session.lock().volume = volume;

        debug!(volume, deferred = fading, "Volume set");
        self.inner.publish(EngineEvent::VolumeChanged { volume });
        Ok(())
    }

    /// Current frequency-domain snapshot, one byte per bin. Empty when inert.
    pub fn frequency_data(&self) -> Vec<u8> {
        let Ok(host) = self.inner.host() else {
            return Vec::new();
        };
        let mut data = vec![0u8; host.graph.frequency_bin_count()];
        host.graph.byte_frequency_data(&mut data);
        data
    }

    /// Current time-domain snapshot, sized like [`frequency_data`](Self::frequency_data).
    pub fn waveform_data(&self) -> Vec<u8> {
        let Ok(host) = self.inner.host() else {
            return Vec::new();
        };
        let mut data = vec![0u8; host.graph.frequency_bin_count()];
        host.graph.byte_time_domain_data(&mut data);
        data
    }

    pub fn playback_rate(&self) -> f64 {
        self.inner
            .host()
            .map_or(1.0, |host| host.media.playback_rate())
    }

    /// Sets the playback rate. Rates outside the configured range are rejected.
    pub fn set_playback_rate(&self, rate: f64) -> Result<()> {
        let range = &self.inner.config.playback_rate_range;
        if !rate.is_finite() || !range.contains(&rate) {
            return Err(PlaybackError::InvalidPlaybackRate {
                rate,
                min: *range.start(),
                max: *range.end(),
            });
        }
        let host = self.inner.host()?;

        host.media.set_playback_rate(rate)?;
        debug!(rate, "Playback rate set");
        self.inner
            .publish(EngineEvent::PlaybackRateChanged { rate });
        Ok(())
    }

    /// Snapshot of the session. `None` when inert or destroyed.
    pub fn audio_info(&self) -> Option<AudioInfo> {
        let host = self.inner.host().ok()?;
        let media = host.media.as_ref();
        let volume = self.inner.session.lock().volume;

        Some(AudioInfo {
            src: media.src().filter(|src| !src.is_empty()),
            position: finite_or_zero(media.current_time()),
            duration: media_duration(media),
            volume,
            paused: media.paused(),
            ended: media.ended(),
            ready_state: media.ready_state(),
            buffered: media.buffered(),
            playback_rate: media.playback_rate(),
        })
    }

    pub fn is_playing(&self) -> bool {
        self.inner.host().is_ok_and(|host| {
            has_source(host.media.as_ref()) && !host.media.paused() && !host.media.ended()
        })
    }

    pub fn state(&self) -> EngineState {
        self.inner.session.lock().lifecycle
    }

    /// Registers `listener` for notifications of `kind`.
    ///
    /// After [`destroy`](Self::destroy) the returned handle is inert and the
    /// listener is never called.
    pub fn subscribe(&self, kind: MediaEventKind, listener: Listener) -> Subscription {
        let subscription = self.inner.listeners.subscribe(kind, listener);
        if self.inner.is_destroyed() {
            self.inner.listeners.unsubscribe(&subscription);
        }
        subscription
    }

    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        self.inner.listeners.unsubscribe(subscription)
    }

    pub fn listener_count(&self, kind: MediaEventKind) -> usize {
        self.inner.listeners.listener_count(kind)
    }

    /// Channel-based view of the same notifications, plus engine lifecycle
    /// events. Only events published after this call are received.
    pub fn event_stream(&self) -> EventStream {
        EventStream::new(self.inner.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.inner.events
    }

    /// Tears the session down. Safe to call more than once.
    ///
    /// Cancels any crossfade, fails a pending load with
    /// [`PlaybackError::Destroyed`], detaches the notification handler,
    /// releases the media element, closes the processing context and drops
    /// every listener.
    pub async fn destroy(&self) {
        let inner = &self.inner;
        let (pending, crossfade) = {
            let mut session = inner.session.lock();
            if session.destroyed {
                return;
            }
            session.destroyed = true;
            session.lifecycle = EngineState::Destroyed;
            (session.pending_load.take(), session.crossfade.take())
        };

        info!("Destroying audio engine");

        if let Some(crossfade) = crossfade {
            crossfade.token.cancel();
        }
        if let Some(pending) = pending {
            let _ = pending.resolve.send(Err(PlaybackError::Destroyed));
        }

        if let Some(host) = &inner.host {
            host.media.set_event_handler(None);
            if let Err(err) = host.media.pause() {
                warn!(error = %err, "Failed to pause media during teardown");
            }
            if let Err(err) = host.media.release() {
                warn!(error = %err, "Failed to release media element");
            }
            if host.graph.state() != ContextState::Closed {
                if let Err(err) = host.graph.close().await {
                    warn!(error = %err, "Failed to close audio context");
                }
            }
        }

        inner.listeners.clear();
        let _ = inner.events.emit(CoreEvent::Engine(EngineEvent::Destroyed));
    }
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("state", &self.state())
            .field("listeners", &self.inner.listeners)
            .finish()
    }
}

impl EngineInner {
    /// The host, or why there is none.
    pub(crate) fn host(&self) -> Result<&AudioHost> {
        if self.is_destroyed() {
            return Err(PlaybackError::Destroyed);
        }
        self.host.as_ref().ok_or_else(|| {
            PlaybackError::NotInitialized(
                self.init_error
                    .clone()
                    .unwrap_or_else(|| "no audio host".to_string()),
            )
        })
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.session.lock().destroyed
    }

    pub(crate) fn publish(&self, event: EngineEvent) {
        if !self.is_destroyed() {
            let _ = self.events.emit(CoreEvent::Engine(event));
        }
    }

    fn update_lifecycle(&self, transition: impl FnOnce(EngineState) -> EngineState) {
        let mut session = self.session.lock();
        if !session.destroyed {
            session.lifecycle = transition(session.lifecycle);
        }
    }

    #[instrument(skip(self))]
    pub(crate) async fn play_media(&self) -> Result<()> {
        let host = self.host()?;
        if !has_source(host.media.as_ref()) {
            return Err(PlaybackError::NoTrackLoaded);
        }

        match host.graph.state() {
            ContextState::Suspended => {
                debug!("Resuming audio context");
                host.graph.resume().await.map_err(playback_failed)?;
            }
            ContextState::Closed => {
                return Err(PlaybackError::PlaybackFailed(
                    "audio context is closed".to_string(),
                ));
            }
            ContextState::Running => {}
        }

        host.media.play().await.map_err(playback_failed)?;

        if self.is_destroyed() {
            return Err(PlaybackError::Destroyed);
        }
        self.update_lifecycle(|state| match state {
            EngineState::Loading => EngineState::Loading,
            _ => EngineState::Playing,
        });
        debug!("Playback started");
        Ok(())
    }

    fn duration(&self) -> f64 {
        self.host()
            .map_or(0.0, |host| media_duration(host.media.as_ref()))
    }

    pub(crate) async fn load_source(&self, url: &str) -> Result<()> {
        let src = url.trim();
        if src.is_empty() {
            return Err(PlaybackError::InvalidSource("empty URL".to_string()));
        }
        let host = self.host()?;

        let (resolve, resolved) = oneshot::channel();
        let (generation, superseded) = {
            let mut session = self.session.lock();
            if session.destroyed {
                return Err(PlaybackError::Destroyed);
            }
            session.generation += 1;
            let generation = session.generation;
            let superseded = session.pending_load.replace(PendingLoad {
                generation,
                src: src.to_string(),
                resolve,
            });
            session.lifecycle = EngineState::Loading;
            (generation, superseded)
        };
        // Releases the slot if this future is dropped before it settles.
        let _slot = LoadSlot {
            inner: self,
            generation,
        };

        if let Some(stale) = superseded {
            warn!(
                src = redact_url(&stale.src),
                generation = stale.generation,
                "Load superseded by a newer load"
            );
            self.publish(EngineEvent::LoadSuperseded {
                src: stale.src.clone(),
            });
            let _ = stale
                .resolve
                .send(Err(PlaybackError::Superseded(stale.src)));
        }

        info!(src = redact_url(src), generation, "Loading track");
        self.publish(EngineEvent::LoadStarted {
            src: src.to_string(),
            generation,
        });

        if let Err(err) = host.media.set_src(src).and_then(|_| host.media.load()) {
            self.abandon_load(generation, EngineState::Error);
            error!(src = redact_url(src), error = %err, "Media rejected the source");
            self.publish(EngineEvent::LoadFailed {
                src: src.to_string(),
                message: err.to_string(),
            });
            return Err(err.into());
        }

        let outcome = match self.config.load_timeout {
            Some(limit) => match timeout(limit, resolved).await {
                Ok(received) => received,
                Err(_) => {
                    self.abandon_load(generation, EngineState::Error);
                    let err = PlaybackError::LoadTimeout {
                        src: src.to_string(),
                        timeout_ms: limit.as_millis() as u64,
                    };
                    error!(src = redact_url(src), error = %err, "Load timed out");
                    self.publish(EngineEvent::LoadFailed {
                        src: src.to_string(),
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            },
            None => resolved.await,
        };
        // A dropped sender means teardown cleared the slot.
        let outcome = outcome.unwrap_or(Err(PlaybackError::Destroyed));

        match &outcome {
            Ok(()) => {
                let duration = self.duration();
                info!(src = redact_url(src), duration, "Track ready");
                self.publish(EngineEvent::LoadCompleted {
                    src: src.to_string(),
                    duration,
                });
            }
            Err(PlaybackError::Superseded(_)) | Err(PlaybackError::Destroyed) => {}
            Err(err) => {
                error!(src = redact_url(src), error = %err, "Track failed to load");
                self.publish(EngineEvent::LoadFailed {
                    src: src.to_string(),
                    message: err.to_string(),
                });
            }
        }
        outcome
    }

    /// Drops the pending slot if it still belongs to `generation`, moving the
    /// lifecycle to `fallback`.
    fn abandon_load(&self, generation: u64, fallback: EngineState) -> bool {
        let mut session = self.session.lock();
        let owned = session
            .pending_load
            .as_ref()
            .is_some_and(|pending| pending.generation == generation);
        if owned {
            session.pending_load = None;
            if !session.destroyed {
                session.lifecycle = fallback;
            }
        }
        owned
    }

    fn handle_notification(&self, notification: MediaNotification) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        if self.is_destroyed() {
            return;
        }

        let MediaNotification { kind, error } = notification;
        let media = host.media.as_ref();
        let event = PlaybackEvent::new(kind)
            .with_position(finite_or_zero(media.current_time()))
            .with_duration(media_duration(media))
            .with_src(media.src().filter(|src| !src.is_empty()))
            .with_error(error.clone());
        let paused = media.paused();

        let settled = {
            let mut session = self.session.lock();
            if session.destroyed {
                return;
            }
            match kind {
                MediaEventKind::CanPlay | MediaEventKind::CanPlayThrough => {
                    if session.lifecycle == EngineState::Loading {
                        session.lifecycle = if paused {
                            EngineState::Ready
                        } else {
                            EngineState::Playing
                        };
                    }
                    session.pending_load.take().map(|pending| (pending, Ok(())))
                }
                MediaEventKind::Error => {
                    session.lifecycle = EngineState::Error;
                    session.pending_load.take().map(|pending| {
                        let err = load_failed(&pending.src, error.as_ref());
                        (pending, Err(err))
                    })
                }
                MediaEventKind::Play => {
                    if session.lifecycle != EngineState::Loading {
                        session.lifecycle = EngineState::Playing;
                    }
                    None
                }
                MediaEventKind::Pause => {
                    if matches!(
                        session.lifecycle,
                        EngineState::Playing | EngineState::Ready
                    ) {
                        session.lifecycle = EngineState::Paused;
                    }
                    None
                }
                MediaEventKind::Ended => {
                    session.lifecycle = EngineState::Ended;
                    None
                }
                MediaEventKind::LoadStart
                | MediaEventKind::LoadedMetadata
                | MediaEventKind::TimeUpdate
                | MediaEventKind::Waiting => None,
            }
        };

        if let Some((pending, outcome)) = settled {
            let _ = pending.resolve.send(outcome);
        }

        match kind {
            MediaEventKind::Error => {
                let reason = error.as_ref().map_or("unknown", |e| e.message.as_str());
                error!(reason, "Media error");
            }
            MediaEventKind::TimeUpdate => trace!(position = event.position, "timeupdate"),
            _ => debug!(kind = %kind, position = event.position, "Media notification"),
        }

        self.listeners.dispatch(&event);
        if !self.is_destroyed() {
            let _ = self.events.emit(CoreEvent::Playback(event));
        }
    }
}

/// Owned by a running `load_source`. Settled loads have already emptied or
/// replaced the slot, so dropping this only matters for abandoned waits.
struct LoadSlot<'a> {
    inner: &'a EngineInner,
    generation: u64,
}

impl Drop for LoadSlot<'_> {
    fn drop(&mut self) {
        if self.inner.abandon_load(self.generation, EngineState::Idle) {
            debug!(generation = self.generation, "Pending load dropped before settling");
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        if self.session.get_mut().destroyed {
            return;
        }
        // Dropped without `destroy`: at least detach and release the element.
        if let Some(host) = &self.host {
            host.media.set_event_handler(None);
            let _ = host.media.release();
        }
    }
}

/// Holds the rendered gain at `now`, then ramps linearly to `target` over
/// `over`. Returns the context time the ramp ends at.
pub(crate) fn schedule_gain_ramp(
    graph: &dyn AudioGraph,
    target: f32,
    over: Duration,
) -> bridge_traits::error::Result<f64> {
    let now = graph.current_time();
    let current = graph.gain();
    graph.cancel_scheduled_gain(now)?;
    graph.set_gain_at_time(current, now)?;
    let end = now + over.as_secs_f64();
    graph.linear_ramp_gain_to(target, end)?;
    Ok(end)
}

fn has_source(media: &dyn MediaElement) -> bool {
    media.src().is_some_and(|src| !src.is_empty())
}

fn media_duration(media: &dyn MediaElement) -> f64 {
    media
        .duration()
        .filter(|secs| secs.is_finite() && *secs > 0.0)
        .unwrap_or(0.0)
}

fn finite_or_zero(secs: f64) -> f64 {
    if secs.is_finite() {
        secs
    } else {
        0.0
    }
}

fn playback_failed(err: bridge_traits::BridgeError) -> PlaybackError {
    PlaybackError::PlaybackFailed(err.to_string())
}

fn load_failed(src: &str, error: Option<&MediaErrorInfo>) -> PlaybackError {
    PlaybackError::LoadFailed {
        src: src.to_string(),
        reason: error.map_or_else(|| "media error".to_string(), |e| e.to_string()),
        media_error: error.cloned(),
    }
}
