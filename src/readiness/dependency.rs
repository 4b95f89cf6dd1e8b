use super::types::{DependencySettings, WaitOutcome};
use crate::probe::ProbeClient;
use crate::retry::{with_deadline, DeadlineError, RetryError, RetryWithDelay};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Waits for the infrastructure itself to answer
pub struct SingleDependencyWaiter<'a> {
    probe: &'a dyn ProbeClient,
    settings: DependencySettings,
    cancellation_token: CancellationToken,
}

impl<'a> SingleDependencyWaiter<'a> {
    pub fn new(probe: &'a dyn ProbeClient, settings: DependencySettings) -> Self {
        Self {
            probe,
            settings,
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub async fn wait(&self) -> WaitOutcome {
        let retry = RetryWithDelay::from_limit(self.settings.max_retries, self.settings.retry_delay);
        info!(
            "Waiting up to {:?} for infrastructure to become reachable (retry every {:?})",
            self.settings.timeout, self.settings.retry_delay
        );

        let probe = self.probe;
        let attempt = retry.run(
            "infrastructure reachability check",
            &self.cancellation_token,
            || probe.check_infrastructure_reachable(),
        );

        match with_deadline(self.settings.timeout, attempt).await {
            Ok(Ok(info)) => {
                info!(
                    "Infrastructure '{}' is reachable (server version {})",
                    info.name,
                    info.server_version.as_deref().unwrap_or("unknown")
                );
                WaitOutcome::Ready
            }
            Ok(Err(RetryError::Exhausted {
                attempts,
                last_error,
            })) => {
                error!(
                    "Infrastructure still unreachable after {} attempts: {}",
                    attempts, last_error
                );
                WaitOutcome::TimedOut
            }
            Ok(Err(RetryError::Cancelled { attempts })) => {
                warn!(
                    "Infrastructure wait cancelled after {} attempts",
                    attempts
                );
                WaitOutcome::Cancelled
            }
            Err(DeadlineError::TimedOut(timeout)) => {
                error!("Timed out after {:?} waiting for infrastructure", timeout);
                WaitOutcome::TimedOut
            }
        }
    }
}
