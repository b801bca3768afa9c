//! crates/podcast_core/src/ledger.rs
//!
//! Client-side mirror of the account's Hoot balance.
//!
//! The local value is a cache. Submissions spend it optimistically, and every
//! server response that carries a balance overwrites it. All mutation goes
//! through `decrement` and `reconcile` so the two never diverge silently.

use crate::error::{FlowError, FlowResult};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Shared handle to the balance. Clones observe and mutate the same value.
#[derive(Debug, Clone)]
pub struct BalanceLedger {
    tx: Arc<watch::Sender<u32>>,
}

impl BalanceLedger {
    pub fn new(initial: u32) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> u32 {
        *self.tx.borrow()
    }

    /// Fails with `InsufficientBalance` unless at least one Hoot is available.
    pub fn require_funds(&self) -> FlowResult<()> {
        if self.get() < 1 {
            return Err(FlowError::InsufficientBalance);
        }
        Ok(())
    }

    /// Spends exactly one Hoot and returns the new balance.
    ///
    /// At zero this fails without touching the stored value.
    pub fn decrement(&self) -> FlowResult<u32> {
        let mut outcome = Err(FlowError::InsufficientBalance);
        self.tx.send_if_modified(|balance| {
            if *balance < 1 {
                return false;
            }
            *balance -= 1;
            outcome = Ok(*balance);
            true
        });
        if let Ok(remaining) = outcome {
            debug!("Balance decremented to {}", remaining);
        }
        outcome
    }

    /// Replaces the local value with the authoritative server value.
    pub fn reconcile(&self, server_value: u32) {
        let previous = self.tx.send_replace(server_value);
        if previous != server_value {
            debug!("Balance reconciled from {} to {}", previous, server_value);
        }
    }

    /// Receives every change, starting from the current value.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.tx.subscribe()
    }
}

impl Default for BalanceLedger {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrement_spends_one() {
        let ledger = BalanceLedger::new(3);
        assert_eq!(ledger.decrement(), Ok(2));
        assert_eq!(ledger.get(), 2);
    }

    #[test]
    fn decrement_at_zero_fails_without_mutation() {
        let ledger = BalanceLedger::new(0);
        let mut rx = ledger.subscribe();
        assert_eq!(ledger.decrement(), Err(FlowError::InsufficientBalance));
        assert_eq!(ledger.get(), 0);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn reconcile_overrides_pending_local_change() {
        let ledger = BalanceLedger::new(5);
        ledger.decrement().unwrap();
        ledger.reconcile(10);
        assert_eq!(ledger.get(), 10);

        ledger.reconcile(0);
        assert_eq!(ledger.require_funds(), Err(FlowError::InsufficientBalance));
    }

    #[tokio::test]
    async fn subscribers_see_changes_from_clones() {
        let ledger = BalanceLedger::new(1);
        let mut rx = ledger.subscribe();
        let other = ledger.clone();

        other.reconcile(7);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 7);
        assert_eq!(ledger.get(), 7);
    }
}
