//! Polling of remote resources until they reach a terminal state.

use log::*;
use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;
use tokio::time;

/// Interval between two upload status queries.
pub const UPLOAD_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Interval between two run status queries.
pub const RUN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Errors produced by [`poll_until`] itself.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PollError {
    /// The terminal state was not reached within the allowed attempts.
    #[error("'{resource}' not finished after {attempts} status queries")]
    Exhausted {
        /// What was being polled.
        resource: String,
        /// How many times the status was fetched.
        attempts: u32,
    },
}

/// How a resource is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between two fetches.
    pub interval: Duration,
    /// Give up after this many fetches, `None` polls forever.
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    /// Poll forever with the given interval.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` fetches.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Policy used for uploads.
    pub fn uploads() -> Self {
        Self::every(UPLOAD_POLL_INTERVAL)
    }

    /// Policy used for runs.
    pub fn runs() -> Self {
        Self::every(RUN_POLL_INTERVAL)
    }
}

/// Fetch the status of `resource` until `is_terminal` accepts it.
///
/// A status that is terminal on the Nth fetch returns after N fetches and N-1
/// sleeps. `on_tick` runs after every non-terminal fetch. Fetch errors are
/// returned right away.
pub async fn poll_until<S, E, F, Fut>(
    resource: &str,
    policy: &PollPolicy,
    mut fetch: F,
    is_terminal: impl Fn(&S) -> bool,
    mut on_tick: impl FnMut(&S),
) -> Result<S, E>
where
    S: Debug,
    E: From<PollError>,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<S, E>>,
{
    let mut attempts = 0u32;
    loop {
        let status = fetch().await?;
        attempts += 1;
        trace!("{}: status {:?} (query {})", resource, status, attempts);

        if is_terminal(&status) {
            debug!("{}: finished with {:?} after {} queries", resource, status, attempts);
            return Ok(status);
        }

        if let Some(max) = policy.max_attempts {
            if attempts >= max {
                return Err(PollError::Exhausted {
                    resource: resource.into(),
                    attempts,
                }
                .into());
            }
        }

        on_tick(&status);
        time::sleep(policy.interval).await;
    }
}
