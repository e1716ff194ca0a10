//! Cooperative cancellation and task teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::AbortHandle;

/// Stop flag checked by background walks between pages.
///
/// Clones share the flag. Once set it stays set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

/// Spawned tasks owned by one component, aborted together on teardown.
///
/// Finished tasks are pruned on every insert so the bag does not grow
/// without bound over a long session.
#[derive(Debug, Clone, Default)]
pub struct TaskBag {
    handles: Arc<Mutex<Vec<AbortHandle>>>,
}

impl TaskBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, handle: AbortHandle) {
        if let Ok(mut handles) = self.handles.lock() {
            handles.retain(|h| !h.is_finished());
            handles.push(handle);
        }
    }

    /// Abort every task still running and empty the bag.
    pub fn cancel_all(&self) {
        if let Ok(mut handles) = self.handles.lock() {
            for handle in handles.drain(..) {
                handle.abort();
            }
        }
    }
}
