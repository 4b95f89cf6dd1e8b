mod client;
mod docker;
mod mock;
mod state;

pub use client::{InfrastructureInfo, ProbeClient};
pub use docker::DockerProbe;
pub use mock::{ScriptedProbe, ScriptedState};
pub use state::{short_id, ComponentState, HealthStatus, SHORT_ID_LEN};
