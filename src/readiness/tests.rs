use super::*;
use crate::probe::{ComponentState, HealthStatus, ProbeClient, ScriptedProbe, ScriptedState};
use crate::topology::{NetworkTopology, NodeComponents};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const ROUND_DELAY: Duration = Duration::from_millis(20);
const GRACE: Duration = Duration::from_millis(30);

fn settings(max_rounds: u32) -> NetworkSettings {
    NetworkSettings {
        max_rounds,
        round_delay: ROUND_DELAY,
    }
}

fn single_node(signer: bool) -> NetworkTopology {
    let mut components = NodeComponents::new("client-id", "pm-id");
    if signer {
        components = components.with_signer("signer-id");
    }
    NetworkTopology::new()
        .with_node("nodeA", components)
        .unwrap()
}

fn orchestrator(
    probe: &Arc<ScriptedProbe>,
    topology: NetworkTopology,
    settings: NetworkSettings,
    buffer: &SharedBuffer,
) -> NetworkReadinessOrchestrator {
    let probe: Arc<dyn ProbeClient> = Arc::clone(probe) as Arc<dyn ProbeClient>;
    NetworkReadinessOrchestrator::new(probe, Arc::new(topology), settings, GRACE)
        .with_diagnostics(DiagnosticSink::new(buffer.clone()))
}

fn state(id: &str, status: &str, health: HealthStatus) -> ComponentState {
    ComponentState::new(id, id, status, health)
}

#[test]
fn test_aggregate_settled() {
    let states = vec![
        state("a", "running", HealthStatus::Healthy),
        state("b", "running", HealthStatus::None),
    ];
    let summary = RoundSummary::aggregate(&states);
    assert_eq!(summary.verdict, RoundVerdict::Settled);
    assert!(summary.unhealthy.is_empty());
}

#[test]
fn test_aggregate_first_dead_wins() {
    let states = vec![
        state("a", "running", HealthStatus::Starting),
        state("b", "exited", HealthStatus::None),
        state("c", "dead", HealthStatus::None),
        state("d", "running", HealthStatus::Unhealthy),
    ];
    let summary = RoundSummary::aggregate(&states);
    match summary.verdict {
        RoundVerdict::Dead(dead) => assert_eq!(dead.component_id, "b"),
        other => panic!("expected dead verdict, got {:?}", other),
    }
    assert!(summary.unhealthy.is_empty());
}

#[test]
fn test_aggregate_keeps_unhealthy_seen_before_death() {
    let states = vec![
        state("a", "running", HealthStatus::Unhealthy),
        state("b", "exited", HealthStatus::None),
        state("c", "running", HealthStatus::Unhealthy),
    ];
    let summary = RoundSummary::aggregate(&states);
    assert!(matches!(summary.verdict, RoundVerdict::Dead(ref dead) if dead.component_id == "b"));
    let ids: Vec<&str> = summary
        .unhealthy
        .iter()
        .map(|s| s.component_id.as_str())
        .collect();
    assert_eq!(ids, vec!["a"]);
}

#[test]
fn test_aggregate_flags_unhealthy() {
    let states = vec![
        state("a", "running", HealthStatus::Healthy),
        state("b", "running", HealthStatus::Unhealthy),
    ];
    let summary = RoundSummary::aggregate(&states);
    assert_eq!(summary.verdict, RoundVerdict::StillSettling);
    assert_eq!(summary.unhealthy.len(), 1);
    assert_eq!(summary.unhealthy[0].component_id, "b");
}

#[test]
fn test_aggregate_is_stable_for_settled_input() {
    let states = vec![
        state("a", "running", HealthStatus::Healthy),
        state("b", "running", HealthStatus::Healthy),
    ];
    for _ in 0..5 {
        assert_eq!(
            RoundSummary::aggregate(&states).verdict,
            RoundVerdict::Settled
        );
    }
}

#[tokio::test]
async fn test_settled_on_first_round_is_ready_without_sleeping() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()])
            .component("signer-id", "signer", vec![ScriptedState::running(HealthStatus::None)]),
    );
    let buffer = SharedBuffer::new();
    let slow = NetworkSettings {
        max_rounds: 10,
        round_delay: Duration::from_secs(30),
    };

    let started = Instant::now();
    let report = orchestrator(&probe, single_node(true), slow, &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::Ready);
    assert_eq!(report.rounds_polled, 1);
    assert!(!report.grace_applied);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(probe.calls("client-id"), 1);
    assert_eq!(probe.calls("signer-id"), 1);
    assert!(buffer.contents().is_empty());
}

#[tokio::test]
async fn test_dead_signer_fails_immediately() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()])
            .component("signer-id", "signer", vec![ScriptedState::exited()])
            .with_logs("signer-id", &["signer: fatal key store error"]),
    );
    let buffer = SharedBuffer::new();

    let mut orchestrator = orchestrator(&probe, single_node(true), settings(10), &buffer);
    let report = orchestrator.run().await;

    match &report.outcome {
        WaitOutcome::Failed { component, .. } => assert_eq!(component, "signer"),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(report.rounds_polled, 1);
    assert_eq!(orchestrator.phase(), WaitPhase::Dead);
    assert_eq!(probe.calls("signer-id"), 1);
    assert_eq!(probe.calls("client-id"), 1);

    let logs = buffer.contents();
    assert!(logs.contains("signer logs (dead"));
    assert!(logs.contains("signer: fatal key store error"));
}

#[tokio::test]
async fn test_death_in_later_round_is_not_masked() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component(
                "pm-id",
                "privacy-manager",
                vec![
                    ScriptedState::starting(),
                    ScriptedState::starting(),
                    ScriptedState::exited(),
                ],
            ),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert!(matches!(
        report.outcome,
        WaitOutcome::Failed { ref component, .. } if component == "privacy-manager"
    ));
    assert_eq!(report.rounds_polled, 3);
    assert_eq!(probe.calls("pm-id"), 3);
}

#[tokio::test]
async fn test_settles_on_second_round_with_grace() {
    // nodeA: client healthy, privacy manager starting then healthy
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component(
                "pm-id",
                "privacy-manager",
                vec![ScriptedState::starting(), ScriptedState::healthy()],
            ),
    );
    let buffer = SharedBuffer::new();

    let started = Instant::now();
    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::ReadyAfterGrace);
    assert_eq!(report.rounds_polled, 2);
    assert!(report.grace_applied);
    assert!(started.elapsed() >= ROUND_DELAY + GRACE);
    assert_eq!(probe.calls("pm-id"), 2);
}

#[tokio::test]
async fn test_settles_after_several_ongoing_rounds() {
    let k = 3;
    let mut script = vec![ScriptedState::starting(); k];
    script.push(ScriptedState::healthy());

    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", script)
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let started = Instant::now();
    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::ReadyAfterGrace);
    assert_eq!(report.rounds_polled, k as u32 + 1);
    assert!(started.elapsed() >= ROUND_DELAY * k as u32 + GRACE);
}

#[tokio::test]
async fn test_exhausted_rounds_time_out() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::starting()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let started = Instant::now();
    let mut orchestrator = orchestrator(&probe, single_node(false), settings(4), &buffer);
    let report = orchestrator.run().await;

    assert_eq!(report.outcome, WaitOutcome::TimedOut);
    assert_eq!(report.rounds_polled, 4);
    assert!(!report.grace_applied);
    assert_eq!(orchestrator.phase(), WaitPhase::Exhausted);
    assert_eq!(probe.calls("client-id"), 4);
    // three delays between four rounds, no grace
    assert!(started.elapsed() >= ROUND_DELAY * 3);
}

#[tokio::test]
async fn test_settling_on_last_round_times_out() {
    let mut script = vec![ScriptedState::starting(); 3];
    script.push(ScriptedState::healthy());

    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", script)
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let mut orchestrator = orchestrator(&probe, single_node(false), settings(4), &buffer);
    let report = orchestrator.run().await;

    assert_eq!(report.outcome, WaitOutcome::TimedOut);
    assert_eq!(report.rounds_polled, 4);
    assert!(!report.grace_applied);
    assert_eq!(orchestrator.phase(), WaitPhase::Exhausted);
    assert_eq!(probe.calls("client-id"), 4);
}

#[tokio::test]
async fn test_settling_before_last_round_gets_grace() {
    let mut script = vec![ScriptedState::starting(); 2];
    script.push(ScriptedState::healthy());

    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", script)
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(4), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::ReadyAfterGrace);
    assert_eq!(report.rounds_polled, 3);
}

#[tokio::test]
async fn test_single_round_budget_settled_is_ready() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(1), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::Ready);
}

#[tokio::test]
async fn test_unhealthy_logs_captured_when_later_component_dies() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::unhealthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::exited()])
            .with_logs("client-id", &["peer handshake failing"])
            .with_logs("pm-id", &["tessera: database locked"]),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert!(matches!(
        report.outcome,
        WaitOutcome::Failed { ref component, .. } if component == "privacy-manager"
    ));
    let logs = buffer.contents();
    assert!(logs.contains("client logs (unhealthy"));
    assert!(logs.contains("peer handshake failing"));
    assert!(logs.contains("privacy-manager logs (dead"));
    assert!(logs.contains("tessera: database locked"));
}

#[tokio::test]
async fn test_stable_network_stays_ready() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    for expected_calls in 1..=3 {
        let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
            .run()
            .await;
        assert_eq!(report.outcome, WaitOutcome::Ready);
        assert_eq!(probe.calls("client-id"), expected_calls);
    }
}

#[tokio::test]
async fn test_unhealthy_component_logs_are_captured() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component(
                "client-id",
                "client",
                vec![ScriptedState::unhealthy(), ScriptedState::healthy()],
            )
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()])
            .with_logs("client-id", &["waiting for peers"]),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::ReadyAfterGrace);
    let logs = buffer.contents();
    assert!(logs.contains("client logs (unhealthy"));
    assert!(logs.contains("waiting for peers"));
    assert!(!logs.contains("privacy-manager logs"));
}

#[tokio::test]
async fn test_probe_errors_are_treated_as_ongoing() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component(
                "client-id",
                "client",
                vec![
                    ScriptedState::ProbeError("connection reset".to_string()),
                    ScriptedState::healthy(),
                ],
            )
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::ReadyAfterGrace);
    assert_eq!(report.rounds_polled, 2);
}

#[tokio::test]
async fn test_log_stream_failure_does_not_mask_death() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::exited()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()])
            .with_failing_logs("client-id"),
    );
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .run()
        .await;

    assert!(matches!(
        report.outcome,
        WaitOutcome::Failed { ref component, .. } if component == "client"
    ));
    assert!(buffer.contents().contains("end of client logs"));
}

#[tokio::test]
async fn test_round_probes_run_concurrently() {
    let latency = Duration::from_millis(200);
    let mut probe = ScriptedProbe::new().with_latency(latency);
    let mut topology = NetworkTopology::new();
    for node in 0..3 {
        let client = format!("client-{}", node);
        let pm = format!("pm-{}", node);
        probe = probe
            .component(&client, &client, vec![ScriptedState::healthy()])
            .component(&pm, &pm, vec![ScriptedState::healthy()]);
        topology
            .add_node(format!("node{}", node), NodeComponents::new(client, pm))
            .unwrap();
    }
    let probe = Arc::new(probe);
    let buffer = SharedBuffer::new();

    let started = Instant::now();
    let report = orchestrator(&probe, topology, settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::Ready);
    // six sequential probes would take 1.2s
    assert!(started.elapsed() < latency * 4);
}

#[tokio::test]
async fn test_poll_round_keeps_topology_order() {
    let probe: Arc<dyn ProbeClient> = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("signer-id", "signer", vec![ScriptedState::starting()]),
    );
    // pm-id is not known to the probe, so its probe errors
    let components = single_node(true).flatten();
    let cancel = CancellationToken::new();

    let states = poll_round(&probe, &components, &cancel).await.unwrap();

    let names: Vec<&str> = states.iter().map(|s| s.component_name.as_str()).collect();
    assert_eq!(names, vec!["client", "nodeA/privacy-manager", "signer"]);
    assert_eq!(states[1].health_status, HealthStatus::Unknown);
    assert!(states[1].is_ongoing());
}

#[tokio::test]
async fn test_cancel_during_round_delay() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::starting()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();
    let cancel = CancellationToken::new();
    let slow = NetworkSettings {
        max_rounds: 10,
        round_delay: Duration::from_secs(30),
    };

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let mut orchestrator =
        orchestrator(&probe, single_node(false), slow, &buffer).with_cancellation(cancel);
    let report = orchestrator.run().await;

    assert_eq!(report.outcome, WaitOutcome::Cancelled);
    assert_eq!(report.rounds_polled, 1);
    assert_eq!(orchestrator.phase(), WaitPhase::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_grace_period() {
    let probe: Arc<dyn ProbeClient> = Arc::new(
        ScriptedProbe::new()
            .component(
                "client-id",
                "client",
                vec![ScriptedState::starting(), ScriptedState::healthy()],
            )
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let mut orchestrator = NetworkReadinessOrchestrator::new(
        probe,
        Arc::new(single_node(false)),
        settings(10),
        Duration::from_secs(30),
    )
    .with_diagnostics(DiagnosticSink::new(SharedBuffer::new()))
    .with_cancellation(cancel);
    let report = orchestrator.run().await;

    assert_eq!(report.outcome, WaitOutcome::Cancelled);
    assert_eq!(report.rounds_polled, 2);
    assert!(!report.grace_applied);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_cancel_during_round_join() {
    let probe = Arc::new(
        ScriptedProbe::new()
            .with_latency(Duration::from_secs(30))
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );
    let buffer = SharedBuffer::new();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let started = Instant::now();
    let report = orchestrator(&probe, single_node(false), settings(10), &buffer)
        .with_cancellation(cancel)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_empty_topology_is_ready() {
    let probe = Arc::new(ScriptedProbe::new());
    let buffer = SharedBuffer::new();

    let report = orchestrator(&probe, NetworkTopology::new(), settings(10), &buffer)
        .run()
        .await;

    assert_eq!(report.outcome, WaitOutcome::Ready);
    assert_eq!(report.rounds_polled, 0);
}

#[tokio::test]
async fn test_wait_for_network_returns_outcome() {
    let probe: Arc<dyn ProbeClient> = Arc::new(
        ScriptedProbe::new()
            .component("client-id", "client", vec![ScriptedState::healthy()])
            .component("pm-id", "privacy-manager", vec![ScriptedState::healthy()]),
    );

    let outcome = wait_for_network(
        probe,
        single_node(false),
        settings(10),
        GRACE,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome, WaitOutcome::Ready);
    assert!(outcome.is_ready());
}

fn dependency_settings(timeout: Duration) -> DependencySettings {
    DependencySettings {
        retry_delay: Duration::from_millis(20),
        timeout,
        max_retries: None,
    }
}

#[tokio::test]
async fn test_dependency_ready_after_failures() {
    let probe = ScriptedProbe::new().reachable_after(3);

    let outcome = wait_for_single_dependency(
        &probe,
        dependency_settings(Duration::from_secs(10)),
        CancellationToken::new(),
    )
    .await;

    assert_eq!(outcome, WaitOutcome::Ready);
    assert_eq!(probe.reachability_checks(), 4);
}

#[tokio::test]
async fn test_dependency_times_out() {
    let probe = ScriptedProbe::new().unreachable();
    let timeout = Duration::from_millis(150);

    let started = Instant::now();
    let outcome = wait_for_single_dependency(
        &probe,
        dependency_settings(timeout),
        CancellationToken::new(),
    )
    .await;
    let elapsed = started.elapsed();

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(elapsed >= timeout);
    assert!(elapsed < Duration::from_secs(2));
    assert!(probe.reachability_checks() > 1);
}

#[tokio::test]
async fn test_dependency_retry_cap_reports_timeout() {
    let probe = ScriptedProbe::new().unreachable();
    let settings = DependencySettings {
        retry_delay: Duration::from_millis(5),
        timeout: Duration::from_secs(10),
        max_retries: Some(2),
    };

    let outcome = wait_for_single_dependency(&probe, settings, CancellationToken::new()).await;

    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert_eq!(probe.reachability_checks(), 2);
}

#[tokio::test]
async fn test_dependency_wait_cancelled() {
    let probe = ScriptedProbe::new().unreachable();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let outcome = wait_for_single_dependency(
        &probe,
        DependencySettings {
            retry_delay: Duration::from_secs(30),
            timeout: Duration::from_secs(60),
            max_retries: None,
        },
        cancel,
    )
    .await;

    assert_eq!(outcome, WaitOutcome::Cancelled);
    assert!(started.elapsed() < Duration::from_secs(5));
}
