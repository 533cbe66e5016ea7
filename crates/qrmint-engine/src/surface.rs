//! Off-screen rendering surfaces.
//!
//! A surface is created for each render attempt and handed to the renderer
//! as a [`SurfaceWriter`]. The renderer fills it some time later; the
//! pipeline waits on the output-ready signal with a timeout. Dropping the
//! [`OffscreenSurface`] disposes it, so every exit path of an attempt
//! releases it, and late writes after disposal are discarded.

use crate::renderer::RenderOutput;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

#[derive(Debug, Default)]
struct Shared {
    output: Mutex<Option<RenderOutput>>,
    ready: Notify,
    disposed: AtomicBool,
}

impl Shared {
    /// Lock the output slot. `disposed` only changes while this is held.
    fn lock_output(&self) -> MutexGuard<'_, Option<RenderOutput>> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self) -> Option<RenderOutput> {
        self.lock_output().take()
    }
}

/// Creates surfaces and tracks how many are alive.
#[derive(Debug, Clone, Default)]
pub struct SurfaceHost {
    live: Arc<AtomicUsize>,
    next_id: Arc<AtomicU64>,
}

impl SurfaceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh, empty surface.
    pub fn create(&self) -> OffscreenSurface {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        debug!(surface = id, "Created off-screen surface");
        OffscreenSurface {
            id,
            shared: Arc::new(Shared::default()),
            live: Arc::clone(&self.live),
        }
    }

    /// Number of surfaces not yet disposed.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// A transient surface owned by one render attempt.
#[derive(Debug)]
pub struct OffscreenSurface {
    id: u64,
    shared: Arc<Shared>,
    live: Arc<AtomicUsize>,
}

impl OffscreenSurface {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Handle the renderer uses to deliver its output.
    pub fn writer(&self) -> SurfaceWriter {
        SurfaceWriter {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Wait until the renderer writes, or give up after `timeout`.
    pub async fn wait_for_output(&self, timeout: Duration) -> Option<RenderOutput> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(output) = self.shared.take() {
                return Some(output);
            }
            if tokio::time::timeout_at(deadline, self.shared.ready.notified())
                .await
                .is_err()
            {
                // One last look in case the write raced the deadline.
                return self.shared.take();
            }
        }
    }
}

impl Drop for OffscreenSurface {
    fn drop(&mut self) {
        let stale = {
            let mut output = self.shared.lock_output();
            self.shared.disposed.store(true, Ordering::SeqCst);
            output.take()
        };
        drop(stale);
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!(surface = self.id, "Disposed off-screen surface");
    }
}

/// Write side of a surface, cloneable into renderer tasks.
#[derive(Debug, Clone)]
pub struct SurfaceWriter {
    shared: Arc<Shared>,
}

impl SurfaceWriter {
    /// Deliver output. Returns `false` if the surface was already disposed.
    pub fn write(&self, output: RenderOutput) -> bool {
        {
            let mut slot = self.shared.lock_output();
            if self.is_disposed() {
                return false;
            }
            *slot = Some(output);
        }
        self.shared.ready.notify_one();
        true
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }
}
