// crates/core/src/admission.rs
//! Bounds how many separation invocations run at once.
//!
//! The engine monopolizes a scarce compute resource (typically one GPU),
//! so jobs must queue for a slot instead of piling onto it. Callers block
//! in `admit` until a slot frees; the returned `AdmissionSlot` releases
//! its permit on drop, so no exit path can leak one.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A fixed-size pool of permits for engine invocations.
///
/// Owned by the orchestrator instance, not process-global, so tests and
/// embedders can run several pools side by side.
#[derive(Debug, Clone)]
pub struct AdmissionPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// Permission to run one engine invocation. Dropping it returns the slot
/// to the pool.
#[derive(Debug)]
pub struct AdmissionSlot {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPool {
    /// Create a pool with the given capacity. A capacity of zero would
    /// deadlock every caller, so it is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. Suspends as long as necessary; request
    /// timeouts are the caller's concern. Waiters are served in FIFO
    /// order by the underlying semaphore.
    pub async fn admit(&self) -> AdmissionSlot {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .expect("admission semaphore is never closed");
        AdmissionSlot { _permit: permit }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots currently free. Diagnostic only; racy by nature.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
