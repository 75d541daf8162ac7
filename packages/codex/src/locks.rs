//! Per-practitioner execution slots.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use codex_state::PractitionerId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::ConflictPolicy;

/// What a slot remembers between executions.
#[derive(Debug, Default)]
pub struct Slot {
    /// Version of the last state committed through this slot.
    pub committed_version: Option<u64>,
}

impl Slot {
    /// Whether a snapshot at `version` predates the last commit.
    pub fn is_stale(&self, version: u64) -> bool {
        self.committed_version
            .is_some_and(|committed| version < committed)
    }
}

/// One async mutex per practitioner.
///
/// Executions for different practitioners never contend; executions for the
/// same practitioner are serialized. A slot that never committed is evicted
/// once nobody holds or waits on it. Committed slots keep their version
/// watermark, so the map holds at most one entry per practitioner that has
/// committed through this engine.
#[derive(Debug, Clone, Default)]
pub struct PractitionerLocks {
    slots: Arc<Mutex<SlotMap>>,
}

type SlotMap = HashMap<PractitionerId, Arc<AsyncMutex<Slot>>>;

impl PractitionerLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: PractitionerId) -> Arc<AsyncMutex<Slot>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(slots.entry(id).or_default())
    }

    /// Take the slot for `id`, or `None` if the policy gives up.
    pub async fn acquire(&self, id: PractitionerId, policy: ConflictPolicy) -> Option<SlotGuard> {
        let slot = self.slot(id);
        let guard = match policy {
            ConflictPolicy::FailFast => Arc::clone(&slot).try_lock_owned().ok(),
            ConflictPolicy::Wait(limit) => {
                tokio::time::timeout(limit, Arc::clone(&slot).lock_owned())
                    .await
                    .ok()
            }
        };
        drop(slot);
        match guard {
            Some(guard) => Some(SlotGuard {
                guard,
                id,
                slots: Arc::clone(&self.slots),
            }),
            None => {
                self.evict_abandoned(id);
                None
            }
        }
    }

    /// A waiter that timed out may be the last one to let go of a slot
    /// whose holder already left.
    fn evict_abandoned(&self, id: PractitionerId) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idle = slots.get(&id).is_some_and(|slot| {
            Arc::strong_count(slot) == 1
                && slot
                    .try_lock()
                    .is_ok_and(|slot| slot.committed_version.is_none())
        });
        if idle {
            slots.remove(&id);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one practitioner's slot.
pub struct SlotGuard {
    guard: OwnedMutexGuard<Slot>,
    id: PractitionerId,
    slots: Arc<Mutex<SlotMap>>,
}

impl Deref for SlotGuard {
    type Target = Slot;

    fn deref(&self) -> &Slot {
        &self.guard
    }
}

impl DerefMut for SlotGuard {
    fn deref_mut(&mut self) -> &mut Slot {
        &mut self.guard
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if self.guard.committed_version.is_some() {
            return;
        }
        // The map and this guard hold the only references; new holders can
        // only clone under the map lock.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idle = slots
            .get(&self.id)
            .is_some_and(|slot| Arc::strong_count(slot) == 2);
        if idle {
            slots.remove(&self.id);
        }
    }
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("id", &self.id)
            .field("slot", &*self.guard)
            .finish()
    }
}
