use super::state::ComponentState;
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;

/// What the container engine reports about itself when reachable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfrastructureInfo {
    pub name: String,
    pub server_version: Option<String>,
}

/// Source of component state and logs.
///
/// Implementations must tolerate concurrent `get_state` calls for distinct ids.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Query the current observable state of one component
    async fn get_state(&self, component_id: &str) -> Result<ComponentState>;

    /// Write the component's recent log output to `sink`, one line per entry
    async fn stream_logs(&self, component_id: &str, sink: &mut (dyn Write + Send)) -> Result<()>;

    /// Check that the infrastructure itself answers
    async fn check_infrastructure_reachable(&self) -> Result<InfrastructureInfo>;
}
