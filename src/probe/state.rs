use serde::Serialize;
use std::fmt;

/// Length of the identifier prefix shown in operator output
pub const SHORT_ID_LEN: usize = 12;

/// Fine-grained health reported by a component's health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// No health check is configured
    None,
    Starting,
    Healthy,
    Unhealthy,
    /// The probe could not determine health
    Unknown,
}

impl HealthStatus {
    /// Parse a platform health string, case-insensitively.
    /// An empty string means the component defines no health check.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "none" => HealthStatus::None,
            "starting" => HealthStatus::Starting,
            "healthy" => HealthStatus::Healthy,
            "unhealthy" => HealthStatus::Unhealthy,
            _ => HealthStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::None => "none",
            HealthStatus::Starting => "starting",
            HealthStatus::Healthy => "healthy",
            HealthStatus::Unhealthy => "unhealthy",
            HealthStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one infrastructure component at poll time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentState {
    pub component_id: String,
    pub component_name: String,
    pub status: String,
    pub health_status: HealthStatus,
}

impl ComponentState {
    pub fn new<S: Into<String>>(
        component_id: S,
        component_name: S,
        status: S,
        health_status: HealthStatus,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            component_name: component_name.into(),
            status: status.into(),
            health_status,
        }
    }

    /// State recorded when the probe itself failed. The component is kept
    /// ongoing until it answers.
    pub fn unreachable(component_id: &str, component_name: &str) -> Self {
        Self::new(
            component_id,
            component_name,
            "unknown",
            HealthStatus::Unknown,
        )
    }

    /// True when the component has exited and cannot recover on its own
    pub fn is_dead(&self) -> bool {
        self.status.eq_ignore_ascii_case("dead") || self.status.eq_ignore_ascii_case("exited")
    }

    /// True when the component is still moving towards a settled state.
    ///
    /// Running with a `healthy` check, or running without any check, is the
    /// terminal state. Anything else short of death is ongoing, `unhealthy`
    /// included.
    pub fn is_ongoing(&self) -> bool {
        if self.is_dead() {
            return false;
        }
        let running = self.status.eq_ignore_ascii_case("running");
        !(running
            && matches!(
                self.health_status,
                HealthStatus::Healthy | HealthStatus::None
            ))
    }

    pub fn is_settled(&self) -> bool {
        !self.is_dead() && !self.is_ongoing()
    }

    pub fn is_unhealthy(&self) -> bool {
        self.health_status == HealthStatus::Unhealthy
    }

    /// Identifier truncated for log output
    pub fn short_id(&self) -> &str {
        short_id(&self.component_id)
    }
}

/// Truncate an identifier to the first few characters, respecting char boundaries
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
