//! In-memory host for engine tests.
//!
//! `FakeMedia` behaves like a small `HTMLAudioElement`: in auto-ready mode
//! `load()` reports `loadstart`, `loadedmetadata`, `canplay` and
//! `canplaythrough` synchronously, before it returns, which is the harshest
//! re-entrancy case the engine has to survive. In manual mode the test
//! decides when the media becomes playable.
//!
//! `FakeGraph` clocks itself off `tokio::time::Instant`, so paused-time tests
//! see gain ramps progress exactly as scheduled.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::graph::{AudioBackend, AudioGraph, AudioHost, ContextState, GraphOptions};
use bridge_traits::media::{
    MediaElement, MediaErrorCode, MediaErrorInfo, MediaEventHandler, MediaEventKind,
    MediaNotification, ReadyState, TimeRange,
};
use core_playback::{AudioEngine, EngineConfig};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::time::Instant;

pub const DEFAULT_TRACK_SECS: f64 = 180.0;

// ============================================================================
// Media element
// ============================================================================

#[derive(Debug)]
struct MediaState {
    src: Option<String>,
    current_time: f64,
    duration: Option<f64>,
    playback_rate: f64,
    paused: bool,
    ended: bool,
    ready_state: ReadyState,
    released: bool,
}

pub struct FakeMedia {
    state: Mutex<MediaState>,
    handler: Mutex<Option<MediaEventHandler>>,
    auto_ready: Mutex<bool>,
    reject_play: Mutex<bool>,
    failing: Mutex<HashSet<String>>,
    durations: Mutex<HashMap<String, f64>>,
    loads: Mutex<Vec<String>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MediaState {
                src: None,
                current_time: 0.0,
                duration: None,
                playback_rate: 1.0,
                paused: true,
                ended: false,
                ready_state: ReadyState::HaveNothing,
                released: false,
            }),
            handler: Mutex::new(None),
            auto_ready: Mutex::new(true),
            reject_play: Mutex::new(false),
            failing: Mutex::new(HashSet::new()),
            durations: Mutex::new(HashMap::new()),
            loads: Mutex::new(Vec::new()),
        }
    }

    /// Stop reporting readiness from inside `load()`; call [`make_ready`]
    /// instead.
    pub fn manual(self) -> Self {
        *self.auto_ready.lock() = false;
        self
    }

    pub fn fail_on(&self, src: &str) {
        self.failing.lock().insert(src.to_string());
    }

    pub fn with_duration(&self, src: &str, secs: f64) {
        self.durations.lock().insert(src.to_string(), secs);
    }

    pub fn reject_play(&self, reject: bool) {
        *self.reject_play.lock() = reject;
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    pub fn has_handler(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Delivers `kind` to the installed handler, if any.
    pub fn emit(&self, notification: MediaNotification) {
        let handler = self.handler.lock().clone();
        if let Some(handler) = handler {
            handler(notification);
        }
    }

    /// Marks the current source playable and reports it.
    pub fn make_ready(&self) {
        let src = self.state.lock().src.clone().unwrap_or_default();
        let duration = self
            .durations
            .lock()
            .get(&src)
            .copied()
            .unwrap_or(DEFAULT_TRACK_SECS);
        {
            let mut state = self.state.lock();
            state.duration = Some(duration);
            state.ready_state = ReadyState::HaveMetadata;
        }
        self.emit(MediaNotification::new(MediaEventKind::LoadedMetadata));

        self.state.lock().ready_state = ReadyState::HaveEnoughData;
        self.emit(MediaNotification::new(MediaEventKind::CanPlay));
        self.emit(MediaNotification::new(MediaEventKind::CanPlayThrough));
    }

    /// Moves the playhead and reports `timeupdate`.
    pub fn advance_to(&self, secs: f64) {
        self.state.lock().current_time = secs;
        self.emit(MediaNotification::new(MediaEventKind::TimeUpdate));
    }

    /// Plays to the end and reports `ended`.
    pub fn finish(&self) {
        {
            let mut state = self.state.lock();
            state.current_time = state.duration.unwrap_or(0.0);
            state.paused = true;
            state.ended = true;
        }
        self.emit(MediaNotification::new(MediaEventKind::Pause));
        self.emit(MediaNotification::new(MediaEventKind::Ended));
    }
}

#[async_trait]
impl MediaElement for FakeMedia {
    fn set_src(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.src = Some(url.to_string());
        state.current_time = 0.0;
        state.duration = None;
        state.ended = false;
        state.ready_state = ReadyState::HaveNothing;
        state.released = false;
        Ok(())
    }

    fn src(&self) -> Option<String> {
        self.state.lock().src.clone()
    }

    fn load(&self) -> Result<()> {
        let src = self
            .state
            .lock()
            .src
            .clone()
            .ok_or_else(|| BridgeError::InvalidState("no source".into()))?;
        self.loads.lock().push(src.clone());

        self.emit(MediaNotification::new(MediaEventKind::LoadStart));

        if self.failing.lock().contains(&src) {
            self.emit(MediaNotification::error(MediaErrorInfo::new(
                MediaErrorCode::Network,
                format!("could not fetch {src}"),
            )));
            return Ok(());
        }

        if *self.auto_ready.lock() {
            self.make_ready();
        }
        Ok(())
    }

    async fn play(&self) -> Result<()> {
        if *self.reject_play.lock() {
            return Err(BridgeError::NotAllowed("play() requires a user gesture".into()));
        }
        {
            let mut state = self.state.lock();
            if state.src.is_none() {
                return Err(BridgeError::InvalidState("no source".into()));
            }
            state.paused = false;
            state.ended = false;
        }
        self.emit(MediaNotification::new(MediaEventKind::Play));
        Ok(())
    }

    fn pause(&self) -> Result<()> {
        let was_playing = {
            let mut state = self.state.lock();
            let was_playing = !state.paused;
            state.paused = true;
            was_playing
        };
        if was_playing {
            self.emit(MediaNotification::new(MediaEventKind::Pause));
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.lock().current_time
    }

    fn set_current_time(&self, secs: f64) -> Result<()> {
        let mut state = self.state.lock();
        state.current_time = secs;
        state.ended = false;
        Ok(())
    }

    fn duration(&self) -> Option<f64> {
        self.state.lock().duration
    }

    fn playback_rate(&self) -> f64 {
        self.state.lock().playback_rate
    }

    fn set_playback_rate(&self, rate: f64) -> Result<()> {
        self.state.lock().playback_rate = rate;
        Ok(())
    }

    fn paused(&self) -> bool {
        self.state.lock().paused
    }

    fn ended(&self) -> bool {
        self.state.lock().ended
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready_state
    }

    fn buffered(&self) -> Vec<TimeRange> {
        let state = self.state.lock();
        match (state.ready_state, state.duration) {
            (ReadyState::HaveEnoughData, Some(duration)) => vec![TimeRange::new(0.0, duration)],
            _ => Vec::new(),
        }
    }

    fn set_event_handler(&self, handler: Option<MediaEventHandler>) {
        *self.handler.lock() = handler;
    }

    fn release(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.src = None;
        state.paused = true;
        state.duration = None;
        state.ready_state = ReadyState::HaveNothing;
        state.released = true;
        Ok(())
    }
}

// ============================================================================
// Processing graph
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GainEvent {
    Set { value: f32, at: f64 },
    Ramp { value: f32, end: f64 },
}

impl GainEvent {
    fn time(&self) -> f64 {
        match self {
            GainEvent::Set { at, .. } => *at,
            GainEvent::Ramp { end, .. } => *end,
        }
    }
}

pub struct FakeGraph {
    origin: Instant,
    state: Mutex<ContextState>,
    base_gain: Mutex<f32>,
    automation: Mutex<Vec<GainEvent>>,
    history: Mutex<Vec<GainEvent>>,
    fft_size: u32,
    resumes: Mutex<usize>,
}

impl FakeGraph {
    pub fn new(options: &GraphOptions) -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ContextState::Running),
            base_gain: Mutex::new(options.initial_gain),
            automation: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            fft_size: options.fft_size,
            resumes: Mutex::new(0),
        }
    }

    pub fn suspended(self) -> Self {
        *self.state.lock() = ContextState::Suspended;
        self
    }

    pub fn resume_count(&self) -> usize {
        *self.resumes.lock()
    }

    /// Every gain event ever scheduled, including cancelled ones.
    pub fn history(&self) -> Vec<GainEvent> {
        self.history.lock().clone()
    }

    /// Web Audio automation semantics for the subset the engine uses.
    fn value_at(&self, t: f64) -> f32 {
        let mut value = *self.base_gain.lock();
        let mut since = 0.0;
        for event in self.automation.lock().iter() {
            match *event {
                GainEvent::Set { value: v, at } => {
                    if at > t {
                        break;
                    }
                    value = v;
                    since = at;
                }
                GainEvent::Ramp { value: v, end } => {
                    if end <= t {
                        value = v;
                        since = end;
                    } else {
                        let span = end - since;
                        let fraction = if span > 0.0 {
                            ((t - since) / span).clamp(0.0, 1.0) as f32
                        } else {
                            1.0
                        };
                        return value + (v - value) * fraction;
                    }
                }
            }
        }
        value
    }

    fn schedule(&self, event: GainEvent) {
        self.history.lock().push(event);
        let mut automation = self.automation.lock();
        automation.push(event);
        automation.sort_by(|a, b| a.time().total_cmp(&b.time()));
    }
}

#[async_trait]
impl AudioGraph for FakeGraph {
    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    async fn resume(&self) -> Result<()> {
        let mut state = self.state.lock();
        if *state == ContextState::Closed {
            return Err(BridgeError::InvalidState("context closed".into()));
        }
        *state = ContextState::Running;
        *self.resumes.lock() += 1;
        Ok(())
    }

    async fn suspend(&self) -> Result<()> {
        *self.state.lock() = ContextState::Suspended;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.state.lock() = ContextState::Closed;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }

    fn gain(&self) -> f32 {
        self.value_at(self.current_time())
    }

    fn set_gain_at_time(&self, value: f32, at: f64) -> Result<()> {
        self.schedule(GainEvent::Set { value, at });
        Ok(())
    }

    fn linear_ramp_gain_to(&self, value: f32, end_time: f64) -> Result<()> {
        self.schedule(GainEvent::Ramp {
            value,
            end: end_time,
        });
        Ok(())
    }

    fn cancel_scheduled_gain(&self, from: f64) -> Result<()> {
        let now = self.current_time();
        let held = self.value_at(now);
        let mut automation = self.automation.lock();
        automation.retain(|event| event.time() < from);
        // Collapse what already played into the base value.
        if automation.iter().all(|event| event.time() <= now) {
            automation.clear();
            *self.base_gain.lock() = held;
        }
        Ok(())
    }

    fn frequency_bin_count(&self) -> usize {
        (self.fft_size / 2) as usize
    }

    fn byte_frequency_data(&self, out: &mut [u8]) {
        for (i, bin) in out.iter_mut().enumerate() {
            *bin = (255 - (i % 256)) as u8;
        }
    }

    fn byte_time_domain_data(&self, out: &mut [u8]) {
        out.fill(128);
    }
}

// ============================================================================
// Backend
// ============================================================================

pub struct FakeBackend {
    pub media: Arc<FakeMedia>,
    graph: Mutex<Option<Arc<FakeGraph>>>,
    suspended: bool,
    available: bool,
}

impl FakeBackend {
    pub fn new(media: FakeMedia) -> Self {
        Self {
            media: Arc::new(media),
            graph: Mutex::new(None),
            suspended: false,
            available: true,
        }
    }

    pub fn suspended(mut self) -> Self {
        self.suspended = true;
        self
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(FakeMedia::new())
        }
    }

    /// The graph handed out by `open`.
    pub fn graph(&self) -> Arc<FakeGraph> {
        self.graph
            .lock()
            .clone()
            .expect("backend was never opened")
    }
}

impl AudioBackend for FakeBackend {
    fn open(&self, options: &GraphOptions) -> Result<AudioHost> {
        if !self.available {
            return Err(BridgeError::NotAvailable("AudioContext".into()));
        }
        let mut graph = FakeGraph::new(options);
        if self.suspended {
            graph = graph.suspended();
        }
        let graph = Arc::new(graph);
        *self.graph.lock() = Some(Arc::clone(&graph));

        Ok(AudioHost {
            media: self.media.clone(),
            graph,
        })
    }

    fn name(&self) -> &str {
        "fake"
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub struct Harness {
    pub engine: AudioEngine,
    pub backend: Arc<FakeBackend>,
}

impl Harness {
    pub fn media(&self) -> &FakeMedia {
        &self.backend.media
    }

    pub fn graph(&self) -> Arc<FakeGraph> {
        self.backend.graph()
    }
}

pub fn harness(config: EngineConfig) -> Harness {
    harness_with(FakeBackend::new(FakeMedia::new()), config)
}

pub fn manual_harness(config: EngineConfig) -> Harness {
    harness_with(FakeBackend::new(FakeMedia::new().manual()), config)
}

pub fn harness_with(backend: FakeBackend, config: EngineConfig) -> Harness {
    let backend = Arc::new(backend);
    let engine = AudioEngine::new(config, backend.clone());
    Harness { engine, backend }
}

/// Lets spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

pub fn assert_gain_near(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 0.02,
        "gain {actual} not within 0.02 of {expected}"
    );
}
