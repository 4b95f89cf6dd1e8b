use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Cancel `token` on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// The handlers run as background tasks; a wait observing the token stops
/// at its next suspension point.
pub fn install_signal_handlers(token: CancellationToken) {
    // Handle SIGTERM (container stop) - Unix only
    #[cfg(unix)]
    {
        let token_sigterm = token.clone();
        tokio::spawn(async move {
            let mut sigterm =
                match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        warn!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };

            tokio::select! {
                _ = token_sigterm.cancelled() => {}
                received = sigterm.recv() => {
                    if received.is_some() {
                        info!("Received SIGTERM signal");
                        token_sigterm.cancel();
                    }
                }
            }
        });
    }

    // Handle SIGINT (Ctrl+C) - Cross-platform
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            received = signal::ctrl_c() => match received {
                Ok(()) => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    token.cancel();
                }
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            },
        }
    });
}
