use super::diagnostics::DiagnosticSink;
use super::round::{log_round, poll_round};
use super::types::{NetworkSettings, NetworkWaitReport, RoundSummary, RoundVerdict, WaitOutcome};
use crate::probe::ProbeClient;
use crate::retry::cancellable_sleep;
use crate::topology::NetworkTopology;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Where the round loop currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPhase {
    Polling(u32),
    Settling,
    Ready,
    Dead,
    Exhausted,
    Cancelled,
}

/// Polls every component of a network round by round until it settles,
/// a component dies, or the round budget runs out
pub struct NetworkReadinessOrchestrator {
    probe: Arc<dyn ProbeClient>,
    topology: Arc<NetworkTopology>,
    settings: NetworkSettings,
    grace_period: Duration,
    diagnostics: DiagnosticSink,
    cancellation_token: CancellationToken,
    phase: WaitPhase,
}

impl NetworkReadinessOrchestrator {
    pub fn new(
        probe: Arc<dyn ProbeClient>,
        topology: Arc<NetworkTopology>,
        settings: NetworkSettings,
        grace_period: Duration,
    ) -> Self {
        Self {
            probe,
            topology,
            settings,
            grace_period,
            diagnostics: DiagnosticSink::stderr(),
            cancellation_token: CancellationToken::new(),
            phase: WaitPhase::Polling(1),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticSink) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn phase(&self) -> WaitPhase {
        self.phase
    }

    fn transition(&mut self, phase: WaitPhase) {
        debug!("Network wait phase {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Run the round loop to a final outcome
    pub async fn run(&mut self) -> NetworkWaitReport {
        let components = self.topology.flatten();
        if components.is_empty() {
            warn!("Network topology has no components, nothing to wait for");
            self.transition(WaitPhase::Ready);
            return NetworkWaitReport::new(WaitOutcome::Ready, 0);
        }

        let max_rounds = self.settings.max_rounds.max(1);
        let mut round: u32 = 1;

        loop {
            self.transition(WaitPhase::Polling(round));
            info!(
                "Checking {} components across {} nodes (round {}/{})",
                components.len(),
                self.topology.nodes().len(),
                round,
                max_rounds
            );

            let states =
                match poll_round(&self.probe, &components, &self.cancellation_token).await {
                    Some(states) => states,
                    None => return self.cancelled(round),
                };
            log_round(round, &states);

            let summary = RoundSummary::aggregate(&states);
            for unhealthy in &summary.unhealthy {
                self.diagnostics
                    .capture(self.probe.as_ref(), unhealthy, "unhealthy")
                    .await;
            }

            match summary.verdict {
                RoundVerdict::Dead(state) => {
                    error!(
                        "Component {} ({}) is dead: status = {}, health = {}",
                        state.component_name,
                        state.short_id(),
                        state.status,
                        state.health_status
                    );
                    self.transition(WaitPhase::Dead);
                    self.diagnostics
                        .capture(self.probe.as_ref(), &state, "dead")
                        .await;
                    return NetworkWaitReport::new(
                        WaitOutcome::Failed {
                            reason: format!("component is {}", state.status.to_ascii_lowercase()),
                            component: state.component_name,
                        },
                        round,
                    );
                }
                RoundVerdict::Settled if round >= max_rounds && round > 1 => {
                    error!(
                        "Wait timed out! Components only settled on the last round ({})",
                        round
                    );
                    self.transition(WaitPhase::Exhausted);
                    return NetworkWaitReport::new(WaitOutcome::TimedOut, round);
                }
                RoundVerdict::Settled => return self.settle(round).await,
                RoundVerdict::StillSettling => {
                    if round >= max_rounds {
                        error!(
                            "Wait timed out! Components still starting after {} rounds",
                            round
                        );
                        self.transition(WaitPhase::Exhausted);
                        return NetworkWaitReport::new(WaitOutcome::TimedOut, round);
                    }

                    info!(
                        "Waiting {:?} ... as components are still starting up",
                        self.settings.round_delay
                    );
                    if !cancellable_sleep(self.settings.round_delay, &self.cancellation_token).await
                    {
                        return self.cancelled(round);
                    }
                    round += 1;
                }
            }
        }
    }

    /// Apply the grace policy once every component is settled
    async fn settle(&mut self, round: u32) -> NetworkWaitReport {
        if round == 1 {
            info!("All good! Network settled on the first round");
            self.transition(WaitPhase::Ready);
            return NetworkWaitReport::new(WaitOutcome::Ready, round);
        }

        self.transition(WaitPhase::Settling);
        info!(
            "Waiting {}s ... as grace period for network to start",
            self.grace_period.as_secs_f64()
        );
        if !cancellable_sleep(self.grace_period, &self.cancellation_token).await {
            return self.cancelled(round);
        }

        info!("Network must be ready after {} rounds", round);
        self.transition(WaitPhase::Ready);
        NetworkWaitReport {
            outcome: WaitOutcome::ReadyAfterGrace,
            rounds_polled: round,
            grace_applied: true,
        }
    }

    fn cancelled(&mut self, round: u32) -> NetworkWaitReport {
        warn!("Network wait cancelled during round {}", round);
        self.transition(WaitPhase::Cancelled);
        NetworkWaitReport::new(WaitOutcome::Cancelled, round)
    }
}
