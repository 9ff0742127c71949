use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use tracing::debug;

use crate::portal::PortalId;

const UNHELD: u64 = u64::MAX;

/// Guard that lets at most one portal be occupied at a time.
///
/// Shared by every scene created with it, which also draw their portal ids
/// from it so a holder id names exactly one portal.
#[derive(Debug)]
pub struct TraversalLock {
    holder: AtomicU64,
    next_portal: AtomicU32,
}

impl Default for TraversalLock {
    fn default() -> Self {
        Self::new()
    }
}

impl TraversalLock {
    pub fn new() -> Self {
        Self {
            holder: AtomicU64::new(UNHELD),
            next_portal: AtomicU32::new(0),
        }
    }

    pub fn allocate_id(&self) -> PortalId {
        PortalId::new(self.next_portal.fetch_add(1, Ordering::Relaxed))
    }

    pub fn try_acquire(&self, portal: PortalId) -> bool {
        let acquired = self
            .holder
            .compare_exchange(
                UNHELD,
                u64::from(portal.raw()),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if acquired {
            debug!("Traversal lock acquired by portal {portal}");
        }
        acquired
    }

    /// Releases the lock if `portal` holds it. Returns whether it did.
    pub fn release(&self, portal: PortalId) -> bool {
        let released = self
            .holder
            .compare_exchange(
                u64::from(portal.raw()),
                UNHELD,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if released {
            debug!("Traversal lock released by portal {portal}");
        }
        released
    }

    pub fn holder(&self) -> Option<PortalId> {
        match self.holder.load(Ordering::Acquire) {
            UNHELD => None,
            raw => u32::try_from(raw).ok().map(PortalId::new),
        }
    }

    pub fn is_held(&self) -> bool {
        self.holder.load(Ordering::Acquire) != UNHELD
    }
}
