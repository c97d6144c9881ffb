//! Exact bridge calls the engine makes against the processing graph.

mod support;

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result};
use bridge_traits::graph::{AudioBackend, AudioGraph, AudioHost, ContextState, GraphOptions};
use core_playback::{AudioEngine, EngineConfig, PlaybackError};
use mockall::mock;
use mockall::predicate::eq;
use mockall::Sequence;
use std::sync::Arc;
use std::time::Duration;
use support::FakeMedia;

mock! {
    AudioGraph {}

    #[async_trait]
    impl AudioGraph for AudioGraph {
        fn state(&self) -> ContextState;
        async fn resume(&self) -> Result<()>;
        async fn suspend(&self) -> Result<()>;
        async fn close(&self) -> Result<()>;
        fn current_time(&self) -> f64;
        fn gain(&self) -> f32;
        fn set_gain_at_time(&self, value: f32, at: f64) -> Result<()>;
        fn linear_ramp_gain_to(&self, value: f32, end_time: f64) -> Result<()>;
        fn cancel_scheduled_gain(&self, from: f64) -> Result<()>;
        fn frequency_bin_count(&self) -> usize;
        fn byte_frequency_data(&self, out: &mut [u8]);
        fn byte_time_domain_data(&self, out: &mut [u8]);
    }
}

struct StaticBackend {
    host: AudioHost,
}

impl AudioBackend for StaticBackend {
    fn open(&self, _options: &GraphOptions) -> Result<AudioHost> {
        Ok(self.host.clone())
    }
}

fn engine_with(graph: MockAudioGraph, config: EngineConfig) -> (AudioEngine, Arc<FakeMedia>) {
    let media = Arc::new(FakeMedia::new());
    let backend = StaticBackend {
        host: AudioHost {
            media: media.clone(),
            graph: Arc::new(graph),
        },
    };
    (AudioEngine::new(config, Arc::new(backend)), media)
}

#[tokio::test]
async fn set_volume_holds_current_gain_then_ramps() {
    let mut graph = MockAudioGraph::new();
    graph.expect_current_time().return_const(10.0);
    graph.expect_gain().return_const(1.0f32);

    let mut seq = Sequence::new();
    graph
        .expect_cancel_scheduled_gain()
        .with(eq(10.0))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    graph
        .expect_set_gain_at_time()
        .with(eq(1.0f32), eq(10.0))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));
    graph
        .expect_linear_ramp_gain_to()
        .withf(|value, end| (*value - 0.5).abs() < 1e-6 && (*end - 10.015).abs() < 1e-9)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let config = EngineConfig::default().with_volume_ramp(Duration::from_millis(15));
    let (engine, _media) = engine_with(graph, config);

    engine.set_volume(0.5).unwrap();
    assert_eq!(engine.volume(), 0.5);
}

#[tokio::test]
async fn failed_ramp_leaves_volume_unchanged() {
    let mut graph = MockAudioGraph::new();
    graph.expect_current_time().return_const(0.0);
    graph.expect_gain().return_const(1.0f32);
    graph.expect_cancel_scheduled_gain().returning(|_| Ok(()));
    graph.expect_set_gain_at_time().returning(|_, _| Ok(()));
    graph
        .expect_linear_ramp_gain_to()
        .returning(|_, _| Err(BridgeError::InvalidState("context closed".into())));

    let (engine, _media) = engine_with(graph, EngineConfig::default());

    let err = engine.set_volume(0.2).unwrap_err();
    assert!(matches!(err, PlaybackError::Bridge(BridgeError::InvalidState(_))));
    assert_eq!(engine.volume(), 1.0);
}

#[tokio::test]
async fn play_resumes_suspended_context_first() {
    let mut graph = MockAudioGraph::new();
    graph.expect_state().return_const(ContextState::Suspended);
    graph.expect_resume().times(1).returning(|| Ok(()));

    let (engine, media) = engine_with(graph, EngineConfig::default());
    engine.load("track.mp3").await.unwrap();

    engine.play().await.unwrap();
    assert!(engine.is_playing());
    assert!(!bridge_traits::media::MediaElement::paused(media.as_ref()));
}

#[tokio::test]
async fn blocked_resume_fails_play_without_starting_media() {
    let mut graph = MockAudioGraph::new();
    graph.expect_state().return_const(ContextState::Suspended);
    graph
        .expect_resume()
        .times(1)
        .returning(|| Err(BridgeError::NotAllowed("no user gesture".into())));

    let (engine, _media) = engine_with(graph, EngineConfig::default());
    engine.load("track.mp3").await.unwrap();

    let err = engine.play().await.unwrap_err();
    assert!(matches!(err, PlaybackError::PlaybackFailed(_)));
    assert!(!engine.is_playing());
}

#[tokio::test]
async fn play_on_closed_context_fails() {
    let mut graph = MockAudioGraph::new();
    graph.expect_state().return_const(ContextState::Closed);
    graph.expect_resume().never();

    let (engine, _media) = engine_with(graph, EngineConfig::default());
    engine.load("track.mp3").await.unwrap();

    assert!(matches!(
        engine.play().await,
        Err(PlaybackError::PlaybackFailed(_))
    ));
}

#[tokio::test]
async fn destroy_closes_context_once() {
    let mut graph = MockAudioGraph::new();
    graph.expect_state().return_const(ContextState::Running);
    graph.expect_close().times(1).returning(|| Ok(()));

    let (engine, media) = engine_with(graph, EngineConfig::default());

    engine.destroy().await;
    engine.destroy().await;
    assert!(media.is_released());
}

#[tokio::test]
async fn analysis_reads_use_bin_count() {
    let mut graph = MockAudioGraph::new();
    graph.expect_frequency_bin_count().return_const(64usize);
    graph
        .expect_byte_frequency_data()
        .times(1)
        .returning(|out| out.fill(7));
    graph
        .expect_byte_time_domain_data()
        .times(1)
        .returning(|out| out.fill(128));

    let (engine, _media) = engine_with(graph, EngineConfig::default());

    assert_eq!(engine.frequency_data(), vec![7u8; 64]);
    assert_eq!(engine.waveform_data(), vec![128u8; 64]);
}
