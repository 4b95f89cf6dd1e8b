use super::client::{InfrastructureInfo, ProbeClient};
use super::state::{ComponentState, HealthStatus};
use crate::error::{NetreadyError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

/// One scripted answer for a component
#[derive(Debug, Clone)]
pub enum ScriptedState {
    State { status: String, health: HealthStatus },
    ProbeError(String),
}

impl ScriptedState {
    pub fn running(health: HealthStatus) -> Self {
        ScriptedState::State {
            status: "running".to_string(),
            health,
        }
    }

    pub fn healthy() -> Self {
        Self::running(HealthStatus::Healthy)
    }

    pub fn starting() -> Self {
        Self::running(HealthStatus::Starting)
    }

    pub fn unhealthy() -> Self {
        Self::running(HealthStatus::Unhealthy)
    }

    pub fn exited() -> Self {
        ScriptedState::State {
            status: "exited".to_string(),
            health: HealthStatus::None,
        }
    }
}

#[derive(Debug, Default)]
struct ScriptedComponent {
    name: String,
    script: Vec<ScriptedState>,
    calls: usize,
    logs: Vec<String>,
    fail_logs: bool,
}

#[derive(Debug, Default)]
struct ScriptedInfra {
    failures_before_success: u32,
    checks: u32,
}

/// In-memory probe that replays per-component state sequences.
///
/// Each `get_state` call for a component advances its script by one entry;
/// the last entry repeats once the script runs out.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    components: Mutex<HashMap<String, ScriptedComponent>>,
    infra: Mutex<ScriptedInfra>,
    probe_latency: Option<Duration>,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every `get_state` call, useful to check that probes overlap
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.probe_latency = Some(latency);
        self
    }

    pub fn component(self, id: &str, name: &str, script: Vec<ScriptedState>) -> Self {
        self.components.lock().insert(
            id.to_string(),
            ScriptedComponent {
                name: name.to_string(),
                script,
                ..Default::default()
            },
        );
        self
    }

    pub fn with_logs(self, id: &str, lines: &[&str]) -> Self {
        if let Some(component) = self.components.lock().get_mut(id) {
            component.logs = lines.iter().map(|l| l.to_string()).collect();
        }
        self
    }

    pub fn with_failing_logs(self, id: &str) -> Self {
        if let Some(component) = self.components.lock().get_mut(id) {
            component.fail_logs = true;
        }
        self
    }

    /// Fail the reachability check `failures` times before answering
    pub fn reachable_after(self, failures: u32) -> Self {
        self.infra.lock().failures_before_success = failures;
        self
    }

    /// Never answer the reachability check
    pub fn unreachable(self) -> Self {
        self.reachable_after(u32::MAX)
    }

    pub fn calls(&self, id: &str) -> usize {
        self.components.lock().get(id).map(|c| c.calls).unwrap_or(0)
    }

    pub fn reachability_checks(&self) -> u32 {
        self.infra.lock().checks
    }
}

#[async_trait]
impl ProbeClient for ScriptedProbe {
    async fn get_state(&self, component_id: &str) -> Result<ComponentState> {
        if let Some(latency) = self.probe_latency {
            tokio::time::sleep(latency).await;
        }

        let mut components = self.components.lock();
        let component = components
            .get_mut(component_id)
            .ok_or_else(|| NetreadyError::probe(component_id, "no such component"))?;

        let index = component.calls.min(component.script.len().saturating_sub(1));
        component.calls += 1;

        match component.script.get(index) {
            Some(ScriptedState::State { status, health }) => Ok(ComponentState::new(
                component_id.to_string(),
                component.name.clone(),
                status.clone(),
                *health,
            )),
            Some(ScriptedState::ProbeError(message)) => {
                Err(NetreadyError::probe(component_id, message.as_str()))
            }
            None => Err(NetreadyError::probe(component_id, "empty script")),
        }
    }

    async fn stream_logs(&self, component_id: &str, sink: &mut (dyn Write + Send)) -> Result<()> {
        let (lines, fail) = {
            let components = self.components.lock();
            let component = components
                .get(component_id)
                .ok_or_else(|| NetreadyError::probe(component_id, "no such component"))?;
            (component.logs.clone(), component.fail_logs)
        };

        if fail {
            return Err(NetreadyError::probe(component_id, "log stream closed"));
        }
        for line in lines {
            writeln!(sink, "{}", line)?;
        }

        Ok(())
    }

    async fn check_infrastructure_reachable(&self) -> Result<InfrastructureInfo> {
        let mut infra = self.infra.lock();
        infra.checks = infra.checks.saturating_add(1);
        if infra.checks <= infra.failures_before_success {
            return Err(NetreadyError::system("infrastructure not reachable"));
        }

        Ok(InfrastructureInfo {
            name: "scripted-engine".to_string(),
            server_version: Some("0.0.0".to_string()),
        })
    }
}
