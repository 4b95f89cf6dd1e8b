use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Action to take after a failed attempt
#[derive(Debug, Clone, PartialEq)]
pub enum RetryAction {
    /// Retry after a delay
    RetryAfterDelay(Duration),
    /// Attempt budget spent
    GiveUp,
}

/// Terminal failure of a retried operation
#[derive(Error, Debug)]
pub enum RetryError<E> {
    #[error("retries exhausted after {attempts} attempts, last error: {last_error}")]
    Exhausted { attempts: u32, last_error: E },

    #[error("retry cancelled after {attempts} attempts")]
    Cancelled { attempts: u32 },
}

impl<E> RetryError<E> {
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts } => {
                *attempts
            }
        }
    }
}

/// Failure of a deadline-bounded future
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DeadlineError {
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Run `future` to completion unless `deadline` elapses first.
///
/// Anything the future is waiting on when the deadline fires, including a
/// retry delay, is dropped and the timeout is reported.
pub async fn with_deadline<F>(deadline: Duration, future: F) -> Result<F::Output, DeadlineError>
where
    F: Future,
{
    tokio::time::timeout(deadline, future)
        .await
        .map_err(|_| DeadlineError::TimedOut(deadline))
}

/// Sleep for `duration` unless `cancel` fires first. Returns false when cancelled.
pub async fn cancellable_sleep(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}

/// Retry a fallible operation with a fixed delay between attempts.
///
/// Attempt counters live inside each `run` call, so one value can be reused.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryWithDelay {
    max_retries: Option<u32>,
    delay: Duration,
}

impl RetryWithDelay {
    /// Give up once `max_retries` attempts have failed
    pub fn new(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries: Some(max_retries),
            delay,
        }
    }

    /// Retry forever; pair with [`with_deadline`] to bound it
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_retries: None,
            delay,
        }
    }

    pub fn from_limit(max_retries: Option<u32>, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }

    /// Decide what to do after `failed_attempts` failures
    pub fn next_action(&self, failed_attempts: u32) -> RetryAction {
        match self.max_retries {
            Some(max) if failed_attempts >= max => RetryAction::GiveUp,
            _ => RetryAction::RetryAfterDelay(self.delay),
        }
    }

    /// Run `operation` until it succeeds, the attempt budget is spent or `cancel` fires
    pub async fn run<F, Fut, T, E>(
        &self,
        label: &str,
        cancel: &CancellationToken,
        mut operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempts: u32 = 0;

        loop {
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RetryError::Cancelled { attempts }),
                result = operation() => result,
            };

            let error = match result {
                Ok(value) => {
                    if attempts > 0 {
                        info!("{} succeeded after {} retries", label, attempts);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            attempts = attempts.saturating_add(1);

            match self.next_action(attempts) {
                RetryAction::RetryAfterDelay(delay) => {
                    debug!(
                        "{} failed (attempt {}): {}, retrying in {:?}",
                        label, attempts, error, delay
                    );
                    if !cancellable_sleep(delay, cancel).await {
                        return Err(RetryError::Cancelled { attempts });
                    }
                }
                RetryAction::GiveUp => {
                    warn!(
                        "{} failed after {} attempts, giving up: {}",
                        label, attempts, error
                    );
                    return Err(RetryError::Exhausted {
                        attempts,
                        last_error: error,
                    });
                }
            }
        }
    }
}
