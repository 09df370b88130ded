//! Cancellable waiting primitives
//!
//! Every fixed-interval loop in the engine (condition polling, curl retry
//! delays, cluster operation polling) goes through these helpers so that the
//! caller's [`CancellationToken`] is observed at each suspension point.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, Result};

/// Sleep for `duration`, returning `Cancelled` if the token fires first
pub async fn sleep(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoreError::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drive `fut` to completion unless the token fires first
///
/// Dropping the future on cancellation also drops any child process it owns.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(CoreError::Cancelled),
        result = fut => result,
    }
}

/// Polling bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Run `check` immediately, then every `interval` until it reports true or
/// `timeout` elapses
///
/// Returns `Ok(true)` when the check passed, `Ok(false)` on timeout, and the
/// check's own error as soon as one occurs.
pub async fn poll_until<F, Fut>(
    config: PollConfig,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let deadline = Instant::now() + config.timeout;

    loop {
        if cancellable(cancel, check()).await? {
            return Ok(true);
        }

        let now = Instant::now();
        if now >= deadline {
            return Ok(false);
        }

        sleep(config.interval.min(deadline - now), cancel).await?;
    }
}

/// Parse a humantime duration such as `5s` or `2m30s`
pub fn parse_duration(key: &str, value: &str) -> Result<Duration> {
    humantime_parse(value).map_err(|message| CoreError::InvalidValue {
        key: key.to_string(),
        message,
    })
}

fn humantime_parse(value: &str) -> std::result::Result<Duration, String> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| e.to_string())
}
