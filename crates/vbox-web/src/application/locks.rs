//! Per-VM mutual exclusion.
//!
//! Every operation that touches one VM takes that VM's lock for its whole
//! duration, so a power-off can never interleave with a half-sent line of
//! keystrokes.  Operations on different VMs take different locks and run in
//! parallel.
//!
//! Locks are created lazily the first time a VM name is seen and are never
//! removed.  The set of VM names on one host is small, so the map stays tiny.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use vbox_core::VmName;

/// Map from VM name to that VM's exclusive lock.
#[derive(Debug, Default)]
pub struct VmLockRegistry {
    locks: Mutex<HashMap<VmName, Arc<Mutex<()>>>>,
}

impl VmLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `vm` is free and returns a guard that holds it.
    ///
    /// The registry map is only locked long enough to look up (or insert) the
    /// VM's mutex; waiting for the VM itself happens outside it, so callers
    /// queued on one VM never block callers of another.
    pub async fn acquire(&self, vm: &VmName) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.locks.lock().await;
            Arc::clone(map.entry(vm.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn vm(name: &str) -> VmName {
        VmName::parse(name).unwrap()
    }

    #[tokio::test]
    async fn test_same_vm_waits_for_release() {
        let registry = Arc::new(VmLockRegistry::new());
        let guard = registry.acquire(&vm("dev")).await;

        let r = Arc::clone(&registry);
        let waiter = tokio::spawn(async move {
            let _g = r.acquire(&vm("dev")).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished(), "second acquire must wait");

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter finishes after release")
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_vms_do_not_block_each_other() {
        let registry = VmLockRegistry::new();
        let _dev = registry.acquire(&vm("dev")).await;

        let prod = tokio::time::timeout(Duration::from_millis(200), registry.acquire(&vm("prod")))
            .await;

        assert!(prod.is_ok());
    }

    #[tokio::test]
    async fn test_released_lock_can_be_taken_again() {
        let registry = VmLockRegistry::new();

        drop(registry.acquire(&vm("dev")).await);
        let again =
            tokio::time::timeout(Duration::from_millis(200), registry.acquire(&vm("dev"))).await;

        assert!(again.is_ok());
    }
}
