//! Crossfade: fade out, switch source, fade back in, as one cancellable task.
//!
//! ```text
//! gain ─┐                               ┌─ pre-fade volume
//!       └── ramp to 0 ── load ── play ──┘
//! ```
//!
//! Every step is raced against the crossfade's [`CancellationToken`]. A newer
//! `crossfade` or `load` cancels the token. If the sequence stops early and no
//! newer crossfade took over the gain, the gain is ramped back to the target
//! volume so the session is never left silent.

use crate::engine::{schedule_gain_ramp, ActiveCrossfade, AudioEngine, EngineInner};
use crate::error::{PlaybackError, Result};
use bridge_traits::graph::{AudioGraph, AudioHost};
use core_async::sync::CancellationToken;
use core_async::time::{sleep, Duration};
use core_runtime::events::EngineEvent;
use core_runtime::logging::redact_url;
use futures::future::{self, Either};
use std::future::Future;
use tracing::{debug, error, info, warn};

/// Gain within this distance of the ramp target counts as arrived.
const GAIN_EPSILON: f32 = 1e-3;

/// Interval at which a late ramp is re-checked during the completion slack.
const SLACK_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl AudioEngine {
    /// Fades the current track out over `duration`, loads and plays `url`,
    /// then fades back in to the pre-fade volume over the same `duration`.
    ///
    /// Resolves once the fade-in completes. Fails with
    /// [`PlaybackError::Cancelled`] when a newer `crossfade`, a `load` or
    /// [`cancel_crossfade`](Self::cancel_crossfade) interrupts it, and with
    /// the load or play error when either step fails.
    pub async fn crossfade(&self, url: &str, duration: Duration) -> Result<()> {
        let inner = &self.inner;
        let to = url.trim();
        if to.is_empty() {
            return Err(PlaybackError::InvalidSource("empty URL".to_string()));
        }
        let host = inner.host()?;

        let token = CancellationToken::new();
        let (id, previous) = {
            let mut session = inner.session.lock();
            if session.destroyed {
                return Err(PlaybackError::Destroyed);
            }
            session.next_crossfade_id += 1;
            let id = session.next_crossfade_id;
            let previous = session.crossfade.replace(ActiveCrossfade {
                id,
                to: to.to_string(),
                token: token.clone(),
            });
            (id, previous)
        };

        if let Some(previous) = previous {
            debug!(
                to = redact_url(&previous.to),
                "Cancelling crossfade in favour of a newer one"
            );
            previous.token.cancel();
        }

        info!(
            to = redact_url(to),
            duration_ms = duration.as_millis() as u64,
            "Crossfade started"
        );
        inner.publish(EngineEvent::CrossfadeStarted {
            to: to.to_string(),
            duration_secs: duration.as_secs_f64(),
        });

        let faded_in = run_sequence(inner, host, to, duration, &token).await;

        // Clearing the slot and reading the target under one lock: from here on
        // `set_volume` ramps the graph itself.
        let (taken_over, volume) = {
            let mut session = inner.session.lock();
            let taken_over = match session.crossfade.as_ref().map(|active| active.id == id) {
                Some(true) => {
                    session.crossfade = None;
                    false
                }
                Some(false) => true,
                None => false,
            };
            (taken_over, session.volume)
        };

        if let Ok(faded_to) = faded_in {
            if faded_to != volume && !taken_over && !inner.is_destroyed() {
                debug!(from = faded_to, to = volume, "Volume moved during fade-in");
                if let Err(err) =
                    schedule_gain_ramp(host.graph.as_ref(), volume, inner.config.volume_ramp)
                {
                    warn!(error = %err, "Failed to apply volume after crossfade");
                }
            }
        }
        let result = faded_in.map(|_| ());

        match &result {
            Ok(()) => {
                info!(to = redact_url(to), "Crossfade completed");
                inner.publish(EngineEvent::CrossfadeCompleted { to: to.to_string() });
            }
            Err(PlaybackError::Destroyed) => {}
            Err(err) if err.is_stale() => {
                warn!(to = redact_url(to), reason = %err, "Crossfade cancelled");
                inner.publish(EngineEvent::CrossfadeCancelled { to: to.to_string() });
            }
            Err(err) => {
                error!(to = redact_url(to), error = %err, "Crossfade failed");
                inner.publish(EngineEvent::CrossfadeFailed {
                    to: to.to_string(),
                    message: err.to_string(),
                });
            }
        }

        if result.is_err() && !taken_over && !inner.is_destroyed() {
            if let Err(err) =
                schedule_gain_ramp(host.graph.as_ref(), volume, inner.config.volume_ramp)
            {
                warn!(error = %err, "Failed to restore gain after crossfade");
            }
        }

        result
    }

    /// Cancels the in-flight crossfade, if any. Returns whether one was running.
    pub fn cancel_crossfade(&self) -> bool {
        let active = self.inner.session.lock().crossfade.take();
        match active {
            Some(active) => {
                debug!(to = redact_url(&active.to), "Cancelling crossfade");
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_crossfading(&self) -> bool {
        self.inner.session.lock().crossfade.is_some()
    }
}

/// Returns the volume the fade-in ramped to.
async fn run_sequence(
    inner: &EngineInner,
    host: &AudioHost,
    to: &str,
    duration: Duration,
    token: &CancellationToken,
) -> Result<f32> {
    let graph = host.graph.as_ref();
    let slack = inner.config.fade_completion_slack;

    debug!("Crossfade: fading out");
    schedule_gain_ramp(graph, 0.0, duration)?;
    cancellable(token, await_ramp(graph, 0.0, duration, slack)).await?;

    debug!("Crossfade: loading next track");
    cancellable(token, inner.load_source(to)).await??;

    debug!("Crossfade: starting playback");
    cancellable(token, inner.play_media()).await??;

    // Fade back in to whatever the target is now; `set_volume` may have moved it.
    let volume = inner.session.lock().volume;
    debug!(volume, "Crossfade: fading in");
    token_check(token)?;
    schedule_gain_ramp(graph, volume, duration)?;
    cancellable(token, await_ramp(graph, volume, duration, slack)).await?;

    Ok(volume)
}

/// Runs `step` unless `token` fires first.
async fn cancellable<F>(token: &CancellationToken, step: F) -> Result<F::Output>
where
    F: Future,
{
    token_check(token)?;

    let cancelled = token.cancelled();
    futures::pin_mut!(step);
    futures::pin_mut!(cancelled);

    match future::select(step, cancelled).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(PlaybackError::Cancelled),
    }
}

fn token_check(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(PlaybackError::Cancelled)
    } else {
        Ok(())
    }
}

/// Waits out a scheduled ramp. The graph has no completion signal, so this
/// sleeps for the ramp length and then allows up to `slack` for the rendered
/// gain to arrive before moving on regardless.
async fn await_ramp(graph: &dyn AudioGraph, target: f32, duration: Duration, slack: Duration) {
    sleep(duration).await;

    let mut waited = Duration::ZERO;
    while (graph.gain() - target).abs() > GAIN_EPSILON && waited < slack {
        let step = SLACK_POLL_INTERVAL.min(slack - waited);
        sleep(step).await;
        waited += step;
    }

    if (graph.gain() - target).abs() > GAIN_EPSILON {
        debug!(
            gain = graph.gain(),
            target, "Ramp not settled after slack; continuing"
        );
    }
}
