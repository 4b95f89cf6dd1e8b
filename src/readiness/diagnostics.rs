use crate::probe::{ComponentState, ProbeClient};
use chrono::Utc;
use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing::{info, warn};

/// Destination for streamed component logs.
///
/// Capturing is best-effort: failures are reported through `tracing` and
/// never reach the readiness verdict.
pub struct DiagnosticSink {
    writer: Box<dyn Write + Send>,
}

impl DiagnosticSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Stream `state`'s logs into the sink, framed by header and footer lines
    pub async fn capture(&mut self, probe: &dyn ProbeClient, state: &ComponentState, reason: &str) {
        info!(
            "Capturing logs for {} ({}) as it is {}",
            state.component_name,
            state.short_id(),
            reason
        );

        if let Err(e) = writeln!(
            self.writer,
            "===== {} logs ({}, status = {}, health = {}) captured at {} =====",
            state.component_name,
            reason,
            state.status,
            state.health_status,
            Utc::now().to_rfc3339()
        ) {
            warn!("Failed to write diagnostic header: {}", e);
        }

        if let Err(e) = probe
            .stream_logs(&state.component_id, &mut *self.writer)
            .await
        {
            warn!(
                "Failed to stream logs for {} ({}): {}",
                state.component_name,
                state.short_id(),
                e
            );
        }

        if let Err(e) = writeln!(self.writer, "===== end of {} logs =====", state.component_name)
            .and_then(|_| self.writer.flush())
        {
            warn!("Failed to write diagnostic footer: {}", e);
        }
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::stderr()
    }
}

/// In-memory writer whose contents stay readable after it is handed to a sink
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
