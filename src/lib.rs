pub mod config;
pub mod error;
pub mod probe;
pub mod readiness;
pub mod retry;
pub mod shutdown;
pub mod topology;

pub use config::NetreadyConfig;
pub use error::{NetreadyError, Result};
pub use probe::{
    ComponentState, DockerProbe, HealthStatus, InfrastructureInfo, ProbeClient, ScriptedProbe,
    ScriptedState,
};
pub use readiness::{
    wait_for_network, wait_for_single_dependency, DependencySettings, DiagnosticSink,
    NetworkReadinessOrchestrator, NetworkSettings, NetworkWaitReport, SingleDependencyWaiter,
    WaitOutcome,
};
pub use retry::{RetryAction, RetryError, RetryWithDelay};
pub use shutdown::install_signal_handlers;
pub use topology::{ComponentRef, ComponentRole, NetworkTopology, NodeComponents};
