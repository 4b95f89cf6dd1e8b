mod dependency;
mod diagnostics;
mod orchestrator;
mod round;
mod types;

#[cfg(test)]
mod tests;

pub use dependency::SingleDependencyWaiter;
pub use diagnostics::{DiagnosticSink, SharedBuffer};
pub use orchestrator::{NetworkReadinessOrchestrator, WaitPhase};
pub use round::{log_round, poll_round};
pub use types::{
    DependencySettings, NetworkSettings, NetworkWaitReport, RoundSummary, RoundVerdict,
    WaitOutcome,
};

use crate::probe::ProbeClient;
use crate::topology::NetworkTopology;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Wait for the infrastructure to become reachable.
/// Yields `Ready`, `TimedOut` or `Cancelled`.
pub async fn wait_for_single_dependency(
    probe: &dyn ProbeClient,
    settings: DependencySettings,
    cancel: CancellationToken,
) -> WaitOutcome {
    let waiter = SingleDependencyWaiter::new(probe, settings).with_cancellation(cancel);
    waiter.wait().await
}

/// Wait for every component of `topology` to settle, streaming diagnostics to stderr
pub async fn wait_for_network(
    probe: Arc<dyn ProbeClient>,
    topology: NetworkTopology,
    settings: NetworkSettings,
    consensus_grace_period: Duration,
    cancel: CancellationToken,
) -> WaitOutcome {
    let mut orchestrator = NetworkReadinessOrchestrator::new(
        probe,
        Arc::new(topology),
        settings,
        consensus_grace_period,
    )
    .with_cancellation(cancel);

    orchestrator.run().await.outcome
}
