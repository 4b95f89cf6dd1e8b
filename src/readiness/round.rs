use crate::probe::{ComponentState, ProbeClient};
use crate::topology::ComponentRef;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Probe every component concurrently and wait for all of them.
///
/// The returned states are in `components` order regardless of completion
/// order. A probe that errors, or whose task dies, is recorded as
/// unreachable (ongoing) instead of failing the round. Returns `None` when
/// cancelled; in-flight probes are aborted.
pub async fn poll_round(
    probe: &Arc<dyn ProbeClient>,
    components: &[ComponentRef],
    cancel: &CancellationToken,
) -> Option<Vec<ComponentState>> {
    let mut probes = JoinSet::new();

    for (index, component) in components.iter().enumerate() {
        let probe = Arc::clone(probe);
        let component = component.clone();
        probes.spawn(async move {
            let state = match probe.get_state(&component.component_id).await {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Probe failed for {} ({}): {}, treating as still starting",
                        component.label(),
                        component.component_id,
                        e
                    );
                    ComponentState::unreachable(&component.component_id, &component.label())
                }
            };
            (index, state)
        });
    }

    let mut results: Vec<Option<ComponentState>> = vec![None; components.len()];

    let join_all = async {
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((index, state)) => results[index] = Some(state),
                Err(e) => warn!("Probe task did not complete: {}", e),
            }
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return None,
        _ = join_all => {}
    }

    Some(
        results
            .into_iter()
            .zip(components)
            .map(|(state, component)| {
                state.unwrap_or_else(|| {
                    ComponentState::unreachable(&component.component_id, &component.label())
                })
            })
            .collect(),
    )
}

/// One operator-facing line per component, in topology order
pub fn log_round(round: u32, states: &[ComponentState]) {
    for state in states {
        info!(
            "[round {}] {}: id = {}, status = {}, health = {}, dead = {}, ongoing = {}",
            round,
            state.component_name,
            state.short_id(),
            state.status,
            state.health_status,
            state.is_dead(),
            state.is_ongoing()
        );
    }
}
