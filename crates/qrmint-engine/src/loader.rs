//! Waiting for the renderer capability to become available.
//!
//! Generation stays disabled until a renderer can be acquired. The wait is
//! bounded by a poll budget and can be cancelled when the host goes away.

use crate::renderer::{QrCodeRenderer, Renderer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Something that may eventually hand out a renderer.
pub trait RendererSource: Send + Sync {
    /// Return the renderer if it is ready now.
    fn acquire(&self) -> Option<Arc<dyn Renderer>>;
}

/// Source for the renderer compiled into this crate; always ready.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledSource;

impl RendererSource for BundledSource {
    fn acquire(&self) -> Option<Arc<dyn Renderer>> {
        Some(Arc::new(QrCodeRenderer::new()))
    }
}

/// Poll cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadPolicy {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for LoadPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_polls: 80,
        }
    }
}

/// Handle for abandoning a pending wait.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel_tx: mpsc::Sender<()>,
}

impl CancelHandle {
    /// Cancel the wait. Returns `false` if it already finished.
    pub fn cancel(&self) -> bool {
        self.cancel_tx.try_send(()).is_ok()
    }
}

/// Receiving side of a [`CancelHandle`].
#[derive(Debug)]
pub struct CancelSignal {
    cancel_rx: mpsc::Receiver<()>,
}

/// Create a linked cancel handle and signal.
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (cancel_tx, cancel_rx) = mpsc::channel(1);
    (CancelHandle { cancel_tx }, CancelSignal { cancel_rx })
}

/// Wait until `source` yields a renderer.
///
/// Checks once immediately, then once per `poll_interval` up to
/// `max_polls` further times. Dropping the [`CancelHandle`] does not
/// cancel; only an explicit [`CancelHandle::cancel`] does.
pub async fn wait_for_renderer(
    source: &dyn RendererSource,
    policy: LoadPolicy,
    mut cancel: CancelSignal,
) -> Result<Arc<dyn Renderer>, LoadError> {
    if let Some(renderer) = source.acquire() {
        return Ok(renderer);
    }

    let mut ticker = tokio::time::interval(policy.poll_interval);
    // The first tick completes immediately; skip it.
    ticker.tick().await;

    for poll in 1..=policy.max_polls {
        tokio::select! {
            _ = ticker.tick() => {}
            Some(()) = cancel.cancel_rx.recv() => {
                debug!(poll, "Renderer wait cancelled");
                return Err(LoadError::Cancelled);
            }
        }
        if let Some(renderer) = source.acquire() {
            debug!(poll, "Renderer became available");
            return Ok(renderer);
        }
    }

    warn!(polls = policy.max_polls, "Renderer never became available");
    Err(LoadError::Timeout {
        polls: policy.max_polls,
        waited_ms: u64::try_from(policy.poll_interval.as_millis())
            .unwrap_or(u64::MAX)
            .saturating_mul(u64::from(policy.max_polls)),
    })
}

/// Errors that can occur while waiting for the renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The renderer did not show up within the poll budget.
    #[error("Renderer not available after {polls} polls ({waited_ms}ms)")]
    Timeout { polls: u32, waited_ms: u64 },

    /// The wait was abandoned.
    #[error("Renderer wait cancelled")]
    Cancelled,
}
