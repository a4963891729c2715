//! Request / evaluate / sleep loop for rate-limited Jira calls.
//!
//! A 429 either waits for one token to regenerate (when no node is cooling
//! down) or falls back to capped exponential backoff. Tracker and attempt
//! counter live for exactly one fetch.

use crate::backoff::compute_backoff;
use crate::http::{classify_status, issue_url, StatusClass, Transport};
use crate::ratelimit::{RateLimitSignal, SignalError, SignalField, NODE_ID, UNKNOWN_NODE};
use crate::tracker::NodeWaitTracker;
use crate::types::Issue;
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("An unexpected error {status} has occurred")]
    UnexpectedStatus { status: u16, body: String },
    #[error(transparent)]
    MalformedSignal(#[from] SignalError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Which retries advance the attempt counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttemptCounting {
    /// Every retry counts and exhaustion is checked before each one.
    #[default]
    Uniform,
    /// Only renewal waits count; exhaustion is checked on the backoff path only.
    /// Sustained nonzero `retry-after` values never exhaust in this mode.
    RenewalOnly,
}

impl fmt::Display for AttemptCounting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AttemptCounting::Uniform => "uniform",
            AttemptCounting::RenewalOnly => "renewal-only",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub counting: AttemptCounting,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_wait: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
            counting: AttemptCounting::Uniform,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempt: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitKind {
    /// Waiting for one token to regenerate.
    Renewal,
    Backoff,
}

impl fmt::Display for WaitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WaitKind::Renewal => "token renewal",
            WaitKind::Backoff => "backoff",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryAction {
    Sleep { wait: Duration, kind: WaitKind },
    GiveUp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Found(T),
    Exhausted { attempts: u32 },
}

impl<T> FetchOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            FetchOutcome::Found(v) => Some(v),
            FetchOutcome::Exhausted { .. } => None,
        }
    }
}

pub trait Sleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        tokio::time::sleep(duration)
    }
}

impl RetryPolicy {
    /// Records the node's advertised wait and picks the next step.
    ///
    /// A 429 without a usable `retry-after` records nothing and never takes
    /// the renewal wait, same as [`NodeWaitTracker::backoff_for`].
    pub fn on_rate_limited(
        &self,
        state: &mut RetryState,
        tracker: &mut NodeWaitTracker,
        signal: &RateLimitSignal,
    ) -> Result<RetryAction, SignalError> {
        let node = signal.node_key();
        if signal.node_id.is_none() {
            warn!(
                "Rate-limited response has no {} header; tracking as {:?}",
                NODE_ID, UNKNOWN_NODE
            );
        }
        let recorded = match &signal.retry_after_seconds {
            SignalField::Value(wait) => {
                tracker.record_wait(node, *wait);
                true
            }
            other => {
                warn!(
                    "Unusable retry-after ({}) from node {}; not recorded",
                    other, node
                );
                false
            }
        };
        info!("wait_time_per_node: {}", tracker);

        let uniform = self.counting == AttemptCounting::Uniform;
        if uniform && state.attempt >= self.max_attempts {
            return Ok(RetryAction::GiveUp);
        }

        if recorded && !tracker.any_node_waiting() {
            if let Some(wait) = signal.renewal_interval()? {
                state.attempt += 1;
                return Ok(RetryAction::Sleep {
                    wait,
                    kind: WaitKind::Renewal,
                });
            }
            warn!("Node {} advertised no renewal interval; using backoff", node);
        }

        if state.attempt >= self.max_attempts {
            return Ok(RetryAction::GiveUp);
        }
        let wait = compute_backoff(self.min_wait, self.max_wait, state.attempt);
        if uniform {
            state.attempt += 1;
        }
        Ok(RetryAction::Sleep {
            wait,
            kind: WaitKind::Backoff,
        })
    }
}

/// GETs `url` until it succeeds, retries run out, or a fatal status arrives.
pub async fn fetch_with_retries<T, C, S>(
    transport: &C,
    url: &str,
    policy: &RetryPolicy,
    sleeper: &S,
) -> Result<FetchOutcome<T>, FetchError>
where
    T: DeserializeOwned,
    C: Transport,
    S: Sleeper,
{
    let mut state = RetryState::default();
    let mut tracker = NodeWaitTracker::new();
    loop {
        let res = transport.get(url).await?;
        let signal = RateLimitSignal::from_headers(&res.headers);
        signal.log_summary();

        match classify_status(res.status) {
            StatusClass::Ok => {
                let value = serde_json::from_str(&res.body)?;
                return Ok(FetchOutcome::Found(value));
            }
            StatusClass::RateLimited => {
                match policy.on_rate_limited(&mut state, &mut tracker, &signal)? {
                    RetryAction::Sleep { wait, kind } => {
                        info!("Sleeping for: {} seconds ({})", wait.as_secs(), kind);
                        sleeper.sleep(wait).await;
                    }
                    RetryAction::GiveUp => {
                        info!("Maximum retries ({}) exceeded", policy.max_attempts);
                        return Ok(FetchOutcome::Exhausted {
                            attempts: state.attempt,
                        });
                    }
                }
            }
            StatusClass::Other => {
                return Err(FetchError::UnexpectedStatus {
                    status: res.status.as_u16(),
                    body: res.body,
                });
            }
        }
    }
}

pub async fn get_issue_with_retries<C, S>(
    transport: &C,
    endpoint: &str,
    issue_id: &str,
    policy: &RetryPolicy,
    sleeper: &S,
) -> Result<FetchOutcome<Issue>, FetchError>
where
    C: Transport,
    S: Sleeper,
{
    fetch_with_retries(transport, &issue_url(endpoint, issue_id), policy, sleeper).await
}
