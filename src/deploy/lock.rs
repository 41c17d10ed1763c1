// ABOUTME: Per-slot deploy locks serializing deployments to the same production slot.
// ABOUTME: Holder metadata is recorded for status output while a deployment is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::types::SlotName;

/// Information about who holds a slot's deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub acquired_at: DateTime<Utc>,
    /// Slot being deployed.
    pub slot: String,
}

impl LockInfo {
    fn new(slot: &SlotName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
            slot: slot.to_string(),
        }
    }
}

/// Registry of mutual-exclusion locks keyed by slot identity.
///
/// One lock per slot: deployments to the same slot are strictly
/// serialized, deployments to independent slots run in parallel. The lock
/// is held for the lifetime of one `deploy` call and released on drop.
#[derive(Default)]
pub struct SlotLocks {
    locks: Mutex<HashMap<SlotName, Arc<AsyncMutex<()>>>>,
    holders: Arc<Mutex<HashMap<SlotName, LockInfo>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `slot`, waiting for any in-flight deployment
    /// to reach a terminal state first.
    pub async fn acquire(&self, slot: &SlotName) -> SlotGuard {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(slot.clone()).or_default().clone()
        };

        let guard = lock.lock_owned().await;
        let info = LockInfo::new(slot);
        tracing::debug!(slot = %slot, pid = info.pid, "deploy lock acquired");
        self.holders.lock().insert(slot.clone(), info);

        SlotGuard {
            slot: slot.clone(),
            holders: Arc::clone(&self.holders),
            _guard: guard,
        }
    }

    /// Metadata for the deployment currently holding `slot`, if any.
    pub fn holder(&self, slot: &SlotName) -> Option<LockInfo> {
        self.holders.lock().get(slot).cloned()
    }
}

/// A held deploy lock that releases on drop.
pub struct SlotGuard {
    slot: SlotName,
    holders: Arc<Mutex<HashMap<SlotName, LockInfo>>>,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.holders.lock().remove(&self.slot);
        tracing::debug!(slot = %self.slot, "deploy lock released");
    }
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard").field("slot", &self.slot).finish()
    }
}
