use crate::readiness::{DependencySettings, NetworkSettings};
use crate::topology::{natural_cmp, NetworkTopology, NodeComponents};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetreadyConfig {
    pub docker: DockerConfig,
    pub wait: WaitConfig,
    pub dependency: DependencyConfig,
    pub network: NetworkConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DockerConfig {
    /// Docker endpoint (unix://, npipe:// or tcp://); local defaults when unset
    #[serde(default)]
    pub host: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_docker_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WaitConfig {
    /// Skip waiting entirely (template networks that are never started)
    #[serde(default = "default_wait_disable")]
    pub disable: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DependencyConfig {
    /// Delay between reachability checks in seconds
    #[serde(default = "default_dependency_retry_delay")]
    pub retry_delay_seconds: u64,

    /// Overall wall-clock bound in seconds
    #[serde(default = "default_dependency_timeout")]
    pub timeout_seconds: u64,

    /// Optional cap on attempts; the timeout is the bound when unset
    #[serde(default)]
    pub max_retries: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NetworkConfig {
    /// Maximum number of polling rounds
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    /// Delay between polling rounds in seconds
    #[serde(default = "default_round_delay")]
    pub round_delay_seconds: u64,

    /// Consensus mechanism in use (raft, istanbul, qbft, clique, ...)
    #[serde(default)]
    pub consensus: Option<String>,

    /// Grace period applied after a network settles late, in seconds
    #[serde(default = "default_consensus_grace_period")]
    pub consensus_grace_period_seconds: u64,

    /// Per-consensus grace period overrides in seconds
    #[serde(default)]
    pub grace_periods: HashMap<String, u64>,

    /// Node name to component container ids
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeComponents>,
}

impl NetreadyConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("netready.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("docker.timeout_seconds", default_docker_timeout())?
            .set_default("wait.disable", default_wait_disable())?
            .set_default(
                "dependency.retry_delay_seconds",
                default_dependency_retry_delay(),
            )?
            .set_default("dependency.timeout_seconds", default_dependency_timeout())?
            .set_default("network.max_rounds", default_max_rounds())?
            .set_default("network.round_delay_seconds", default_round_delay())?
            .set_default(
                "network.consensus_grace_period_seconds",
                default_consensus_grace_period(),
            )?
            .add_source(File::with_name(&path_str).required(false))
            // NETREADY_NETWORK__MAX_ROUNDS=5 style overrides
            .add_source(
                Environment::with_prefix("NETREADY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: NetreadyConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.docker.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Docker timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.dependency.timeout_seconds == 0 {
            return Err(ConfigError::Message(
                "Dependency timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.dependency.max_retries == Some(0) {
            return Err(ConfigError::Message(
                "Dependency max_retries must be greater than 0 when set".to_string(),
            ));
        }

        if self.network.max_rounds == 0 {
            return Err(ConfigError::Message(
                "Network max_rounds must be greater than 0".to_string(),
            ));
        }

        self.topology()
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(())
    }

    /// Build the network topology; nodes are ordered by name with numbers
    /// compared by value (`node2` before `node10`)
    pub fn topology(&self) -> crate::error::Result<NetworkTopology> {
        let mut nodes: Vec<_> = self.network.nodes.iter().collect();
        nodes.sort_by(|(a, _), (b, _)| natural_cmp(a, b));

        let mut topology = NetworkTopology::new();
        for (name, components) in nodes {
            topology.add_node(name.clone(), components.clone())?;
        }
        Ok(topology)
    }

    /// Grace period for the configured consensus, falling back to the default
    pub fn consensus_grace_period(&self) -> Duration {
        let seconds = self
            .network
            .consensus
            .as_ref()
            .and_then(|consensus| {
                self.network
                    .grace_periods
                    .iter()
                    .find(|(name, _)| name.eq_ignore_ascii_case(consensus))
                    .map(|(_, seconds)| *seconds)
            })
            .unwrap_or(self.network.consensus_grace_period_seconds);

        Duration::from_secs(seconds)
    }

    /// Render the effective configuration, overrides included, as TOML
    pub fn to_toml(&self) -> crate::error::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn network_settings(&self) -> NetworkSettings {
        NetworkSettings {
            max_rounds: self.network.max_rounds,
            round_delay: Duration::from_secs(self.network.round_delay_seconds),
        }
    }

    pub fn dependency_settings(&self) -> DependencySettings {
        DependencySettings {
            retry_delay: Duration::from_secs(self.dependency.retry_delay_seconds),
            timeout: Duration::from_secs(self.dependency.timeout_seconds),
            max_retries: self.dependency.max_retries,
        }
    }
}

impl Default for NetreadyConfig {
    fn default() -> Self {
        Self {
            docker: DockerConfig {
                host: None,
                timeout_seconds: default_docker_timeout(),
            },
            wait: WaitConfig {
                disable: default_wait_disable(),
            },
            dependency: DependencyConfig {
                retry_delay_seconds: default_dependency_retry_delay(),
                timeout_seconds: default_dependency_timeout(),
                max_retries: None,
            },
            network: NetworkConfig {
                max_rounds: default_max_rounds(),
                round_delay_seconds: default_round_delay(),
                consensus: None,
                consensus_grace_period_seconds: default_consensus_grace_period(),
                grace_periods: HashMap::new(),
                nodes: BTreeMap::new(),
            },
        }
    }
}

// Default value functions
fn default_docker_timeout() -> u64 {
    120
}

fn default_wait_disable() -> bool {
    false
}

fn default_dependency_retry_delay() -> u64 {
    5
}
fn default_dependency_timeout() -> u64 {
    300
}

fn default_max_rounds() -> u32 {
    10
}
fn default_round_delay() -> u64 {
    60
}
fn default_consensus_grace_period() -> u64 {
    30
}
