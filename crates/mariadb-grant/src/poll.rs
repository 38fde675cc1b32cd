//! Bounded existence poll
//!
//! The one piece of timing the Grant controller owns: a short, fixed window in
//! which a prerequisite is checked for absence. It is not a retry strategy;
//! backoff across reconciles belongs to the controller runtime.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Poll timing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between checks
    pub interval: Duration,
    /// Total window, measured from the first check
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
        }
    }
}

impl PollConfig {
    /// Create a config from millisecond values
    pub fn from_millis(interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

/// Outcome of a completed poll
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Presence {
    /// A check observed the resource absent
    Absent,
    /// Every check in the window observed the resource present
    StillPresent,
}

/// Why a poll did not complete
#[derive(Debug)]
pub enum PollError<E> {
    /// The check itself failed
    Check(E),
    /// Cancellation was requested
    Cancelled,
}

/// Poll `check` until it reports absence or the window closes.
///
/// `check` returns `Ok(true)` while the resource exists. The first check runs
/// immediately. Cancellation wins over both a pending check and the sleep
/// between checks.
pub async fn poll_absence<F, Fut, E>(
    config: PollConfig,
    cancel: &CancellationToken,
    mut check: F,
) -> Result<Presence, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let deadline = Instant::now() + config.timeout;
    loop {
        let present = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            result = check() => result.map_err(PollError::Check)?,
        };
        if !present {
            return Ok(Presence::Absent);
        }

        let next = Instant::now() + config.interval;
        if next > deadline {
            return Ok(Presence::StillPresent);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PollError::Cancelled),
            _ = sleep_until(next) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn absent_on_first_check_returns_immediately() {
        let start = Instant::now();
        let result = poll_absence(PollConfig::default(), &CancellationToken::new(), || async {
            Ok::<_, ()>(false)
        })
        .await;
        assert!(matches!(result, Ok(Presence::Absent)));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_after_a_few_checks() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();
        let result = poll_absence(PollConfig::default(), &CancellationToken::new(), || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok::<_, ()>(n < 2) }
        })
        .await;
        assert!(matches!(result, Ok(Presence::Absent)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn window_exhaustion_reports_still_present() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();
        let result = poll_absence(PollConfig::default(), &CancellationToken::new(), || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ()>(true) }
        })
        .await;
        assert!(matches!(result, Ok(Presence::StillPresent)));
        // Checks at 0s..=5s
        assert_eq!(calls.load(Ordering::SeqCst), 6);
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn check_error_aborts_the_poll() {
        let result = poll_absence(PollConfig::default(), &CancellationToken::new(), || async {
            Err::<bool, _>("forbidden")
        })
        .await;
        assert!(matches!(result, Err(PollError::Check("forbidden"))));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_mid_window_returns_promptly() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = poll_absence(PollConfig::default(), &cancel, || async {
            Ok::<_, ()>(true)
        })
        .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_a_hanging_check() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result = poll_absence(PollConfig::default(), &cancel, || async {
            std::future::pending::<Result<bool, ()>>().await
        })
        .await;

        assert!(matches!(result, Err(PollError::Cancelled)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn defaults_are_one_second_over_five() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(PollConfig::from_millis(1000, 5000), config);
    }
}
