//! Web Audio implementation of [`AudioGraph`] and [`AudioBackend`].
//!
//! ```text
//! MediaElementAudioSourceNode ──> GainNode ──> AnalyserNode ──> destination
//! ```
//!
//! A media element can be captured by only one source node, so the graph is
//! built once per element and lives as long as the engine.

use crate::error::{js_error, WasmError};
use crate::media::WebMediaElement;
use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::graph::{AudioBackend, AudioGraph, AudioHost, ContextState, GraphOptions};
use std::sync::Arc;
use tracing::{debug, info};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    AnalyserNode, AudioContext, AudioContextState, GainNode, HtmlMediaElement,
    MediaElementAudioSourceNode,
};

/// Audio context plus the fixed gain/analyser chain.
pub struct WebAudioGraph {
    context: AudioContext,
    gain: GainNode,
    analyser: AnalyserNode,
    // Held so the source node outlives the graph.
    _source: MediaElementAudioSourceNode,
}

impl WebAudioGraph {
    /// Creates a context and routes `media` through gain and analyser nodes.
    pub fn connect(media: &HtmlMediaElement, options: &GraphOptions) -> BridgeResult<Self> {
        let context = AudioContext::new().map_err(|err| {
            BridgeError::NotAvailable(format!("AudioContext: {}", WasmError::from(err)))
        })?;

        let source = context
            .create_media_element_source(media)
            .map_err(|err| js_error("create media source", err))?;
        let gain = context
            .create_gain()
            .map_err(|err| js_error("create gain node", err))?;
        let analyser = context
            .create_analyser()
            .map_err(|err| js_error("create analyser", err))?;

        gain.gain().set_value(options.initial_gain);
        analyser.set_fft_size(options.fft_size);
        analyser.set_smoothing_time_constant(options.smoothing_time_constant);

        source
            .connect_with_audio_node(&gain)
            .map_err(|err| js_error("connect source", err))?;
        gain.connect_with_audio_node(&analyser)
            .map_err(|err| js_error("connect gain", err))?;
        analyser
            .connect_with_audio_node(&context.destination())
            .map_err(|err| js_error("connect analyser", err))?;

        debug!(
            fft_size = options.fft_size,
            sample_rate = context.sample_rate(),
            "Web Audio graph connected"
        );

        Ok(Self {
            context,
            gain,
            analyser,
            _source: source,
        })
    }
}

#[async_trait(?Send)]
impl AudioGraph for WebAudioGraph {
    fn state(&self) -> ContextState {
        match self.context.state() {
            AudioContextState::Running => ContextState::Running,
            AudioContextState::Closed => ContextState::Closed,
            _ => ContextState::Suspended,
        }
    }

    async fn resume(&self) -> BridgeResult<()> {
        let promise = self
            .context
            .resume()
            .map_err(|err| js_error("resume", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| js_error("resume", err))?;
        Ok(())
    }

    async fn suspend(&self) -> BridgeResult<()> {
        let promise = self
            .context
            .suspend()
            .map_err(|err| js_error("suspend", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| js_error("suspend", err))?;
        Ok(())
    }

    async fn close(&self) -> BridgeResult<()> {
        let promise = self.context.close().map_err(|err| js_error("close", err))?;
        JsFuture::from(promise)
            .await
            .map_err(|err| js_error("close", err))?;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.context.current_time()
    }

    fn gain(&self) -> f32 {
        self.gain.gain().value()
    }

    fn set_gain_at_time(&self, value: f32, at: f64) -> BridgeResult<()> {
        self.gain
            .gain()
            .set_value_at_time(value, at)
            .map(|_| ())
            .map_err(|err| js_error("setValueAtTime", err))
    }

    fn linear_ramp_gain_to(&self, value: f32, end_time: f64) -> BridgeResult<()> {
        self.gain
            .gain()
            .linear_ramp_to_value_at_time(value, end_time)
            .map(|_| ())
            .map_err(|err| js_error("linearRampToValueAtTime", err))
    }

    fn cancel_scheduled_gain(&self, from: f64) -> BridgeResult<()> {
        self.gain
            .gain()
            .cancel_scheduled_values(from)
            .map(|_| ())
            .map_err(|err| js_error("cancelScheduledValues", err))
    }

    fn frequency_bin_count(&self) -> usize {
        self.analyser.frequency_bin_count() as usize
    }

    fn byte_frequency_data(&self, out: &mut [u8]) {
        self.analyser.get_byte_frequency_data(out);
    }

    fn byte_time_domain_data(&self, out: &mut [u8]) {
        self.analyser.get_byte_time_domain_data(out);
    }
}

/// Opens an `HTMLAudioElement` routed through a fresh `AudioContext`.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebAudioBackend;

impl WebAudioBackend {
    /// Creates the backend. Nothing is acquired until [`AudioBackend::open`].
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for WebAudioBackend {
    #[allow(clippy::arc_with_non_send_sync)]
    fn open(&self, options: &GraphOptions) -> BridgeResult<AudioHost> {
        let media = WebMediaElement::new()?;
        let graph = WebAudioGraph::connect(media.element(), options)?;
        info!(state = %graph.state(), "Web audio host opened");

        Ok(AudioHost {
            media: Arc::new(media),
            graph: Arc::new(graph),
        })
    }

    fn name(&self) -> &str {
        "web-audio"
    }
}
