//! # Core Configuration Module
//!
//! Provides configuration management for the playback engine.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the host audio bridge and the engine tuning settings.
//! It enforces fail-fast validation so an engine is never constructed against
//! a missing capability or an out-of-range setting.
//!
//! ## Required Dependencies
//!
//! - `AudioBackend` - opens the media element and processing graph
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, EngineConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .audio_backend(Arc::new(WebAudioBackend::new()))
//!     .event_buffer_size(256)
//!     .engine(EngineConfig::default().with_volume_ramp(Duration::from_millis(30)))
//!     .build()
//!     .expect("Failed to build config");
//! ```
//!
//! ## Error Handling
//!
//! ```
//! use core_runtime::config::CoreConfig;
//! use core_runtime::Error;
//!
//! let err = CoreConfig::builder().build().unwrap_err();
//! assert!(matches!(err, Error::CapabilityMissing { .. }));
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::graph::{AudioBackend, GraphOptions};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

const MIN_FFT_SIZE: u32 = 32;
const MAX_FFT_SIZE: u32 = 32_768;

/// Playback-rate bounds most browsers accept.
pub const DEFAULT_PLAYBACK_RATE_RANGE: RangeInclusive<f64> = 0.0625..=16.0;

/// Tuning for a single `AudioEngine`.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Analyser FFT size. Power of two in `32..=32768`.
    pub fft_size: u32,
    /// Analyser smoothing, `0.0..=1.0`.
    pub smoothing_time_constant: f64,
    /// Volume the graph starts at, `0.0..=1.0`.
    pub initial_volume: f32,
    /// Length of the ramp used by `set_volume` to avoid zipper noise.
    pub volume_ramp: Duration,
    /// Rates `set_playback_rate` accepts.
    pub playback_rate_range: RangeInclusive<f64>,
    /// Upper bound on how long `load` waits for the media to become playable.
    /// `None` waits indefinitely.
    pub load_timeout: Option<Duration>,
    /// Extra time a fade step waits past its scheduled end before moving on.
    pub fade_completion_slack: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            initial_volume: 1.0,
            volume_ramp: Duration::from_millis(15),
            playback_rate_range: DEFAULT_PLAYBACK_RATE_RANGE,
            load_timeout: Some(Duration::from_secs(30)),
            fade_completion_slack: Duration::from_millis(250),
        }
    }
}

impl EngineConfig {
    pub fn with_fft_size(mut self, fft_size: u32) -> Self {
        self.fft_size = fft_size;
        self
    }

    pub fn with_smoothing(mut self, smoothing: f64) -> Self {
        self.smoothing_time_constant = smoothing;
        self
    }

    pub fn with_initial_volume(mut self, volume: f32) -> Self {
        self.initial_volume = volume;
        self
    }

    pub fn with_volume_ramp(mut self, ramp: Duration) -> Self {
        self.volume_ramp = ramp;
        self
    }

    pub fn with_playback_rate_range(mut self, range: RangeInclusive<f64>) -> Self {
        self.playback_rate_range = range;
        self
    }

    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout = timeout;
        self
    }

    pub fn with_fade_completion_slack(mut self, slack: Duration) -> Self {
        self.fade_completion_slack = slack;
        self
    }

    /// Options handed to `AudioBackend::open`.
    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            fft_size: self.fft_size,
            smoothing_time_constant: self.smoothing_time_constant,
            initial_gain: self.initial_volume,
        }
    }

    /// Validates the settings.
    ///
    /// This checks:
    /// - FFT size is a power of two within the analyser's bounds
    /// - Smoothing and initial volume are within `0.0..=1.0`
    /// - The playback-rate range is finite, positive and non-empty
    /// - The load timeout, when set, is non-zero
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(Error::Config(format!(
                "FFT size must be a power of two between {} and {}, got {}",
                MIN_FFT_SIZE, MAX_FFT_SIZE, self.fft_size
            )));
        }

        if !(0.0..=1.0).contains(&self.smoothing_time_constant) {
            return Err(Error::Config(format!(
                "Smoothing time constant must be within 0.0..=1.0, got {}",
                self.smoothing_time_constant
            )));
        }

        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::Config(format!(
                "Initial volume must be within 0.0..=1.0, got {}",
                self.initial_volume
            )));
        }

        let (min_rate, max_rate) = (
            *self.playback_rate_range.start(),
            *self.playback_rate_range.end(),
        );
        if !(min_rate.is_finite() && max_rate.is_finite()) || min_rate <= 0.0 || min_rate > max_rate
        {
            return Err(Error::Config(format!(
                "Playback rate range {}..={} is invalid",
                min_rate, max_rate
            )));
        }

        if self.load_timeout == Some(Duration::ZERO) {
            return Err(Error::Config(
                "Load timeout must be non-zero. Use None to wait indefinitely.".to_string(),
            ));
        }

        Ok(())
    }
}

/// Runtime configuration: the host bridge plus engine settings.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Host audio bridge (required)
    pub audio_backend: Arc<dyn AudioBackend>,

    /// Capacity of the broadcast `EventBus`
    pub event_buffer_size: usize,

    pub engine: EngineConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("audio_backend", &self.audio_backend.name())
            .field("event_buffer_size", &self.event_buffer_size)
            .field("engine", &self.engine)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        self.engine.validate()
    }
}

fn audio_backend_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "AudioBackend".to_string(),
        message: "AudioBackend implementation is required to open the media element and \
                 processing graph. Web: inject bridge_wasm::WebAudioBackend. \
                 Tests: inject an in-memory fake."
            .to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    audio_backend: Option<Arc<dyn AudioBackend>>,
    event_buffer_size: Option<usize>,
    engine: Option<EngineConfig>,
}

impl CoreConfigBuilder {
    /// Sets the host audio bridge (required).
    pub fn audio_backend(mut self, backend: Arc<dyn AudioBackend>) -> Self {
        self.audio_backend = Some(backend);
        self
    }

    /// Sets the event bus capacity (default 100).
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Returns [`Error::CapabilityMissing`] when no backend was injected and
    /// [`Error::Config`] when a setting is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let audio_backend = self.audio_backend.ok_or_else(audio_backend_missing_error)?;

        let config = CoreConfig {
            audio_backend,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            engine: self.engine.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
