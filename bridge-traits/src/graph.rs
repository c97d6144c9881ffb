//! Audio processing graph bridge.
//!
//! The engine renders the media element through a fixed chain:
//!
//! ```text
//! media source ──> gain ──> analyser ──> output
//! ```
//!
//! The chain is wired once, by [`AudioBackend::open`], and lives as long as the
//! engine. Track changes swap the media source, never the graph. Gain changes
//! are always scheduled against the graph's own clock
//! ([`AudioGraph::current_time`]) so they take effect sample-accurately and
//! without clicks.

use crate::{error::Result, media::MediaElement, platform::PlatformSendSync};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of the processing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Not rendering; typical before the first user gesture.
    Suspended,
    Running,
    /// Resources released. Terminal.
    Closed,
}

impl fmt::Display for ContextState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContextState::Suspended => "suspended",
            ContextState::Running => "running",
            ContextState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Parameters the backend uses when wiring the graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphOptions {
    /// Analyser FFT size. The frequency-bin count is half of it.
    pub fft_size: u32,
    /// Analyser smoothing between successive snapshots (0.0..=1.0).
    pub smoothing_time_constant: f64,
    /// Gain applied before any volume change is scheduled.
    pub initial_gain: f32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            initial_gain: 1.0,
        }
    }
}

impl GraphOptions {
    pub fn frequency_bin_count(&self) -> usize {
        (self.fft_size / 2) as usize
    }
}

/// Host processing-context contract: the gain and analyser nodes plus the
/// context that clocks them.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait AudioGraph: PlatformSendSync {
    fn state(&self) -> ContextState;

    /// Resume rendering. Hosts may require a prior user gesture.
    async fn resume(&self) -> Result<()>;

    async fn suspend(&self) -> Result<()>;

    /// Release the context. Further calls are invalid.
    async fn close(&self) -> Result<()>;

    /// Context clock, in seconds.
    fn current_time(&self) -> f64;

    /// Gain value as rendered right now (may lag a scheduled change).
    fn gain(&self) -> f32;

    /// Schedule an instantaneous gain change at context time `at`.
    fn set_gain_at_time(&self, value: f32, at: f64) -> Result<()>;

    /// Schedule a linear ramp from the previous scheduled value to `value`,
    /// finishing at context time `end_time`.
    fn linear_ramp_gain_to(&self, value: f32, end_time: f64) -> Result<()>;

    /// Drop every gain event scheduled at or after `from`.
    fn cancel_scheduled_gain(&self, from: f64) -> Result<()>;

    fn frequency_bin_count(&self) -> usize;

    /// Copy the current frequency-domain snapshot into `out`.
    fn byte_frequency_data(&self, out: &mut [u8]);

    /// Copy the current time-domain (waveform) snapshot into `out`.
    fn byte_time_domain_data(&self, out: &mut [u8]);
}

/// The pair of native resources an engine session runs on.
#[derive(Clone)]
pub struct AudioHost {
    pub media: Arc<dyn MediaElement>,
    pub graph: Arc<dyn AudioGraph>,
}

impl fmt::Debug for AudioHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioHost")
            .field("media", &"MediaElement { ... }")
            .field("graph_state", &self.graph.state())
            .finish()
    }
}

/// Factory for [`AudioHost`]s.
///
/// `open` acquires a media element and a processing context and wires
/// source → gain → analyser → output exactly once. It fails with
/// [`BridgeError::NotAvailable`](crate::BridgeError::NotAvailable) when the host
/// has no audio capability.
pub trait AudioBackend: PlatformSendSync {
    fn open(&self, options: &GraphOptions) -> Result<AudioHost>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "unnamed"
    }
}
