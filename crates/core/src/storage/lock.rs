use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Single-slot guard against overlapping update runs inside this process. A second caller gets
// `None` immediately instead of queueing behind the first.
#[derive(Debug, Clone, Default)]
pub struct UpdateGuard {
    held: Arc<AtomicBool>,
}

impl UpdateGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<UpdateLease> {
        self.held
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| UpdateLease {
                held: Arc::clone(&self.held),
            })
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

/// Releases the guard on drop, including when the holding future is cancelled.
#[derive(Debug)]
pub struct UpdateLease {
    held: Arc<AtomicBool>,
}

impl Drop for UpdateLease {
    fn drop(&mut self) {
        self.held.store(false, Ordering::Release);
    }
}
