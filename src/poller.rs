use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ProbeError;

/* ============================= SETTINGS ============================= */

/// Poll cadence and overall deadline for one wait stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

/* ============================= WAIT ============================= */

/// Poll `fetch` until `is_ready` holds, `is_fatal` reports a reason, the
/// fetch fails, or `settings.timeout` elapses.
///
/// - `Ok(None)` from `fetch` means the object does not exist yet; keep polling.
/// - Every fetch is bounded by the stage deadline, so a hung read cannot
///   outlive the wait.
/// - Timeout yields `ProbeError::Timeout`; cancellation yields
///   `ProbeError::Cancelled`.
pub async fn wait_for<T, F, Fut, R, X>(
    what: &str,
    settings: PollSettings,
    cancel: &CancellationToken,
    mut fetch: F,
    is_ready: R,
    is_fatal: X,
) -> Result<T, ProbeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, ProbeError>>,
    R: Fn(&T) -> bool,
    X: Fn(&T) -> Option<String>,
{
    let deadline = Instant::now() + settings.timeout;
    let timed_out = || ProbeError::Timeout {
        what: what.to_string(),
        after: settings.timeout,
    };
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            r = timeout_at(deadline, fetch()) => r,
        };

        match fetched {
            Err(_elapsed) => return Err(timed_out()),
            Ok(Err(e)) => return Err(e),
            Ok(Ok(None)) => {
                debug!(what, attempt, "poll_not_found");
            }
            Ok(Ok(Some(state))) => {
                if is_ready(&state) {
                    debug!(what, attempt, "poll_ready");
                    return Ok(state);
                }
                if let Some(reason) = is_fatal(&state) {
                    return Err(ProbeError::Fatal {
                        what: what.to_string(),
                        reason,
                    });
                }
                debug!(what, attempt, "poll_not_ready");
            }
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(timed_out());
        }

        let next = (now + settings.interval).min(deadline);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            _ = sleep_until(next) => {}
        }
    }
}

/* ============================= TESTS ============================= */
