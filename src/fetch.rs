//! Timeout, retry and fallback around a fallible async request.
//!
//! [`RetryingFetcher`] does not know about HTTP. It drives any closure that
//! produces a request future, so the same policy covers the REST client and
//! tests that count attempts.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Whether a failed request is worth repeating.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Timing and retry limits for a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Limit for a single attempt.
    pub timeout: Duration,
    /// Retries after the first attempt; total attempts is `max_retries + 1`.
    pub max_retries: u32,
    /// Backoff before retry `n` (0-based) is `base_delay * 2^n`.
    pub base_delay: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl FetchPolicy {
    pub fn backoff(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry))
    }
}

/// Fetch failures surfaced when no fallback is available.
#[derive(Debug, Error)]
pub enum FetchError<E> {
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("request failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: E,
    },
}

/// Where fetched data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Fresh,
    Fallback,
}

/// Successful fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched<T> {
    pub data: T,
    pub origin: Origin,
    /// Attempts made, including the one that succeeded or gave up.
    pub attempts: u32,
}

impl<T> Fetched<T> {
    pub fn is_fallback(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// Runs requests under a [`FetchPolicy`] and a cancellation token.
///
/// Cancelling the token aborts the in-flight attempt and any backoff sleep;
/// the pending `fetch` returns [`FetchError::Cancelled`].
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    policy: FetchPolicy,
    cancel: CancellationToken,
}

impl RetryingFetcher {
    pub fn new(policy: FetchPolicy) -> Self {
        Self {
            policy,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a child of `parent`, so cancelling the parent also stops this
    /// fetcher.
    pub fn with_parent(policy: FetchPolicy, parent: &CancellationToken) -> Self {
        Self {
            policy,
            cancel: parent.child_token(),
        }
    }

    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run `request` until it succeeds, retries run out, or the fetcher is
    /// cancelled.
    ///
    /// A timeout resolves to `fallback` right away when one is given;
    /// otherwise it counts as a failed attempt. Non-retryable errors stop
    /// early. Once retries are exhausted the fallback is returned if
    /// present, else the last error.
    pub async fn fetch<T, E, F, Fut>(
        &self,
        label: &str,
        fallback: Option<T>,
        mut request: F,
    ) -> Result<Fetched<T>, FetchError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let mut fallback = fallback;
        let mut retry = 0u32;

        loop {
            let attempts = retry + 1;

            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                outcome = tokio::time::timeout(self.policy.timeout, request()) => outcome,
            };

            let error = match outcome {
                Ok(Ok(data)) => {
                    tracing::debug!(label, attempts, "fetch succeeded");
                    return Ok(Fetched {
                        data,
                        origin: Origin::Fresh,
                        attempts,
                    });
                }
                Ok(Err(e)) => {
                    tracing::warn!(label, attempts, "fetch failed: {}", e);
                    let retryable = e.is_retryable();
                    let error = FetchError::Failed {
                        attempts,
                        source: e,
                    };
                    if !retryable {
                        return Self::give_up(label, fallback.take(), attempts, error);
                    }
                    error
                }
                Err(_) => {
                    tracing::warn!(label, attempts, timeout = ?self.policy.timeout, "fetch timed out");
                    if let Some(data) = fallback.take() {
                        return Ok(Fetched {
                            data,
                            origin: Origin::Fallback,
                            attempts,
                        });
                    }
                    FetchError::TimedOut(self.policy.timeout)
                }
            };

            if retry >= self.policy.max_retries {
                return Self::give_up(label, fallback.take(), attempts, error);
            }

            let delay = self.policy.backoff(retry);
            tracing::debug!(label, ?delay, "retrying ({}/{})", retry + 1, self.policy.max_retries);
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            retry += 1;
        }
    }

    fn give_up<T, E>(
        label: &str,
        fallback: Option<T>,
        attempts: u32,
        error: FetchError<E>,
    ) -> Result<Fetched<T>, FetchError<E>> {
        match fallback {
            Some(data) => {
                tracing::info!(label, attempts, "serving fallback data");
                Ok(Fetched {
                    data,
                    origin: Origin::Fallback,
                    attempts,
                })
            }
            None => Err(error),
        }
    }
}
