//! Timers.
//!
//! - Native: `tokio::time` (honours paused time in tests).
//! - WASM: `gloo-timers`, i.e. the browser's `setTimeout`.
//!
//! [`timeout`] has the same signature and error type on both targets so the
//! engine can enforce load deadlines without `cfg` noise.

use std::fmt;
use std::future::Future;

pub use std::time::Duration;

/// Error returned when a [`timeout`] deadline elapses first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutError;

impl fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimeoutError {}

/// Sleeps for the specified duration.
#[cfg(not(target_arch = "wasm32"))]
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}

/// Sleeps for the specified duration using the browser's `setTimeout`.
#[cfg(target_arch = "wasm32")]
pub async fn sleep(duration: Duration) {
    gloo_timers::future::sleep(duration).await
}

/// Requires `future` to complete before `duration` has elapsed.
///
/// ```rust
/// use core_async::time::{timeout, Duration};
///
/// # async fn example() {
/// let ready = timeout(Duration::from_secs(1), async { 42 }).await;
/// assert_eq!(ready, Ok(42));
/// # }
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub async fn timeout<F>(duration: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimeoutError)
}

/// Requires `future` to complete before `duration` has elapsed.
#[cfg(target_arch = "wasm32")]
pub async fn timeout<F>(duration: Duration, future: F) -> Result<F::Output, TimeoutError>
where
    F: Future,
{
    let deadline = sleep(duration);

    futures::pin_mut!(future);
    futures::pin_mut!(deadline);

    match futures::future::select(future, deadline).await {
        futures::future::Either::Left((output, _)) => Ok(output),
        futures::future::Either::Right(_) => Err(TimeoutError),
    }
}

/// Converts fractional seconds (the unit audio clocks speak) into a `Duration`.
///
/// Negative and non-finite inputs saturate to zero.
pub fn secs_f64(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
