use crate::probe::ComponentState;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Aggregated classification of one polling round
#[derive(Debug, Clone, PartialEq)]
pub enum RoundVerdict {
    /// First dead component in topology order
    Dead(ComponentState),
    StillSettling,
    Settled,
}

/// Verdict of a round plus the components whose logs should be captured
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary {
    pub verdict: RoundVerdict,
    pub unhealthy: Vec<ComponentState>,
}

impl RoundSummary {
    /// Classify a complete round in topology order. The first dead component
    /// wins; unhealthy components seen before it are still reported.
    pub fn aggregate(states: &[ComponentState]) -> Self {
        let mut unhealthy = Vec::new();
        let mut ongoing = false;

        for state in states {
            if state.is_dead() {
                return Self {
                    verdict: RoundVerdict::Dead(state.clone()),
                    unhealthy,
                };
            }
            if state.is_unhealthy() {
                unhealthy.push(state.clone());
            }
            if state.is_ongoing() {
                ongoing = true;
            }
        }

        let verdict = if ongoing {
            RoundVerdict::StillSettling
        } else {
            RoundVerdict::Settled
        };

        Self { verdict, unhealthy }
    }
}

/// Final answer of a wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WaitOutcome {
    Ready,
    ReadyAfterGrace,
    Failed { reason: String, component: String },
    TimedOut,
    /// The wait was aborted by an external shutdown signal
    Cancelled,
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready | WaitOutcome::ReadyAfterGrace)
    }
}

impl fmt::Display for WaitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitOutcome::Ready => write!(f, "ready"),
            WaitOutcome::ReadyAfterGrace => write!(f, "ready after grace period"),
            WaitOutcome::Failed { reason, component } => {
                write!(f, "failed: {} ({})", reason, component)
            }
            WaitOutcome::TimedOut => write!(f, "timed out"),
            WaitOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Detailed result of a network wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkWaitReport {
    pub outcome: WaitOutcome,
    pub rounds_polled: u32,
    pub grace_applied: bool,
}

impl NetworkWaitReport {
    pub(super) fn new(outcome: WaitOutcome, rounds_polled: u32) -> Self {
        Self {
            outcome,
            rounds_polled,
            grace_applied: false,
        }
    }
}

/// Bounds for the network round loop
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkSettings {
    pub max_rounds: u32,
    pub round_delay: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            round_delay: Duration::from_secs(60),
        }
    }
}

/// Bounds for the single-dependency wait
#[derive(Debug, Clone, PartialEq)]
pub struct DependencySettings {
    pub retry_delay: Duration,
    pub timeout: Duration,
    /// `None` leaves the timeout as the only bound
    pub max_retries: Option<u32>,
}

impl Default for DependencySettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
            max_retries: None,
        }
    }
}
