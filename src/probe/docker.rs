use super::client::{InfrastructureInfo, ProbeClient};
use super::state::{short_id, ComponentState, HealthStatus};
use crate::config::DockerConfig;
use crate::error::{NetreadyError, Result};
use async_trait::async_trait;
use bollard::query_parameters::{InspectContainerOptions, LogsOptionsBuilder};
use bollard::Docker;
use futures::StreamExt;
use std::io::Write;
use tracing::{debug, info};

/// Probe client backed by the Docker engine API
pub struct DockerProbe {
    docker: Docker,
}

impl DockerProbe {
    /// Connect using the configured host, or the local defaults when none is set
    pub fn connect(config: &DockerConfig) -> Result<Self> {
        let docker = match config.host.as_deref().filter(|h| !h.trim().is_empty()) {
            Some(host) if host.starts_with("unix://") || host.starts_with("npipe://") => {
                info!("Connecting to Docker socket at {}", host);
                Docker::connect_with_socket(
                    host,
                    config.timeout_seconds,
                    bollard::API_DEFAULT_VERSION,
                )?
            }
            Some(host) => {
                info!("Connecting to Docker host at {}", host);
                Docker::connect_with_http(
                    host,
                    config.timeout_seconds,
                    bollard::API_DEFAULT_VERSION,
                )?
            }
            None => {
                debug!("Connecting to Docker with local defaults");
                Docker::connect_with_local_defaults()?
            }
        };

        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl ProbeClient for DockerProbe {
    async fn get_state(&self, component_id: &str) -> Result<ComponentState> {
        let response = self
            .docker
            .inspect_container(component_id, None::<InspectContainerOptions>)
            .await?;

        let name = response
            .name
            .as_deref()
            .map(|n| n.trim_start_matches('/').to_string())
            .unwrap_or_else(|| short_id(component_id).to_string());

        let state = response.state.ok_or_else(|| {
            NetreadyError::probe(component_id, "container inspection returned no state")
        })?;

        let status = state
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        // Containers without a health check have no health section at all
        let health = state
            .health
            .and_then(|h| h.status)
            .map(|s| HealthStatus::parse(&s.to_string()))
            .unwrap_or(HealthStatus::None);

        Ok(ComponentState::new(
            component_id.to_string(),
            name,
            status,
            health,
        ))
    }

    async fn stream_logs(&self, component_id: &str, sink: &mut (dyn Write + Send)) -> Result<()> {
        let options = LogsOptionsBuilder::default()
            .stdout(true)
            .stderr(true)
            .follow(false)
            .tail("all")
            .build();

        let mut logs = Box::pin(self.docker.logs(component_id, Some(options)));
        while let Some(frame) = logs.next().await {
            let frame = frame?;
            writeln!(sink, "{}", frame.to_string().trim_end())?;
        }
        sink.flush()?;

        Ok(())
    }

    async fn check_infrastructure_reachable(&self) -> Result<InfrastructureInfo> {
        let info = self.docker.info().await?;

        Ok(InfrastructureInfo {
            name: info.name.unwrap_or_else(|| "docker".to_string()),
            server_version: info.server_version,
        })
    }
}
