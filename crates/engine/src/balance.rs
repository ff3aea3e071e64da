//! Shared balance state with an explicit optimistic-update machine
//!
//! `Clean -> OptimisticPending -> Reconciled`: a fetch writes freely when
//! the state is clean, a claim moves it to pending with an immediate
//! local decrement, and reconciliation against the server response moves
//! it to reconciled. A poll result never clobbers a pending optimistic
//! value.

use shake_core::{reconcile_available, Error, FetchStatus, PointsBalance, Result};
use std::sync::RwLock;

/// Where the balance sits relative to an in-flight claim
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalancePhase {
    /// No claim in flight; fetches apply directly
    Clean,
    /// Optimistic decrement applied, awaiting the server response
    OptimisticPending { pre_claim: u32, delta: u32 },
    /// Claim reconciled; the next successful fetch returns to clean
    Reconciled,
}

struct Inner {
    balance: PointsBalance,
    phase: BalancePhase,
}

/// Thread-safe balance shared by the synchronizer and the coordinator
pub struct BalanceStore {
    inner: RwLock<Inner>,
}

impl BalanceStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                balance: PointsBalance::empty(FetchStatus::NoIdentifier),
                phase: BalancePhase::Clean,
            }),
        }
    }

    /// Current balance snapshot
    pub fn snapshot(&self) -> PointsBalance {
        self.inner
            .read()
            .map(|g| g.balance.clone())
            .unwrap_or_else(|_| PointsBalance::empty(FetchStatus::NoIdentifier))
    }

    pub fn phase(&self) -> BalancePhase {
        self.inner
            .read()
            .map(|g| g.phase)
            .unwrap_or(BalancePhase::Clean)
    }

    /// Apply a fetch result. Ignored while a claim is optimistically
    /// pending so a stale poll can't clobber the local decrement; a
    /// fetch after reconciliation returns the machine to clean.
    pub fn apply_fetch(&self, fetched: PointsBalance) {
        if let Ok(mut guard) = self.inner.write() {
            match guard.phase {
                BalancePhase::OptimisticPending { .. } => {
                    // Keep the status stamp for diagnostics, drop the counters
                    guard.balance.last_fetched_at = fetched.last_fetched_at;
                    guard.balance.last_fetch_status = fetched.last_fetch_status;
                }
                _ => {
                    guard.balance = fetched;
                    guard.phase = BalancePhase::Clean;
                }
            }
        }
    }

    /// Start an optimistic claim of `delta` points. Returns the
    /// pre-claim available balance.
    pub fn begin_claim(&self, delta: u32) -> Result<u32> {
        let mut guard = self
            .inner
            .write()
            .map_err(|_| Error::Unknown("Balance lock poisoned".to_string()))?;

        if matches!(guard.phase, BalancePhase::OptimisticPending { .. }) {
            return Err(Error::ClaimInProgress);
        }

        let pre_claim = guard.balance.available_points;
        if pre_claim == 0 {
            return Err(Error::NothingToClaim);
        }

        guard.balance.available_points = pre_claim.saturating_sub(delta);
        guard.phase = BalancePhase::OptimisticPending { pre_claim, delta };
        Ok(pre_claim)
    }

    /// Reconcile the pending claim against the server response.
    /// Returns the reconciled available balance.
    pub fn finish_claim(&self, server_available: Option<u32>, server_total: Option<u32>) -> u32 {
        let Ok(mut guard) = self.inner.write() else {
            return 0;
        };

        let BalancePhase::OptimisticPending { pre_claim, delta } = guard.phase else {
            return guard.balance.available_points;
        };

        let available = reconcile_available(pre_claim, server_available, delta);
        guard.balance.available_points = available;
        if let Some(total) = server_total {
            guard.balance.total_points = total;
        }
        guard.phase = BalancePhase::Reconciled;
        available
    }

    /// Abort the pending claim and restore the pre-claim balance
    pub fn abort_claim(&self) {
        if let Ok(mut guard) = self.inner.write() {
            if let BalancePhase::OptimisticPending { pre_claim, .. } = guard.phase {
                guard.balance.available_points = pre_claim;
                guard.phase = BalancePhase::Clean;
            }
        }
    }

    /// Overwrite counters from a consumed last-claim record (mount path)
    pub fn apply_claim_record(&self, available: u32, total: Option<u32>) {
        if let Ok(mut guard) = self.inner.write() {
            guard.balance.available_points = available;
            if let Some(t) = total {
                guard.balance.total_points = t;
            }
            guard.phase = BalancePhase::Reconciled;
        }
    }
}

impl Default for BalanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(available: u32, total: u32) -> BalanceStore {
        let store = BalanceStore::new();
        store.apply_fetch(PointsBalance::from_counts(available, total));
        store
    }

    #[test]
    fn test_optimistic_decrement_is_immediate() {
        let store = store_with(12, 30);
        let pre = store.begin_claim(10).unwrap();
        assert_eq!(pre, 12);
        // Visible before any network response
        assert_eq!(store.snapshot().available_points, 2);
    }

    #[test]
    fn test_claim_with_zero_available_fails() {
        let store = store_with(0, 10);
        assert!(matches!(store.begin_claim(1), Err(Error::NothingToClaim)));
    }

    #[test]
    fn test_second_claim_blocked_while_pending() {
        let store = store_with(10, 10);
        store.begin_claim(5).unwrap();
        assert!(matches!(store.begin_claim(1), Err(Error::ClaimInProgress)));
    }

    #[test]
    fn test_fetch_does_not_clobber_pending_claim() {
        let store = store_with(12, 30);
        store.begin_claim(10).unwrap();

        // A stale poll arrives mid-claim
        store.apply_fetch(PointsBalance::from_counts(12, 30));
        assert_eq!(store.snapshot().available_points, 2);
        assert!(matches!(
            store.phase(),
            BalancePhase::OptimisticPending { .. }
        ));
    }

    #[test]
    fn test_reconcile_server_decrease_wins() {
        let store = store_with(12, 30);
        store.begin_claim(10).unwrap();
        let available = store.finish_claim(Some(1), Some(40));
        assert_eq!(available, 1);
        assert_eq!(store.snapshot().total_points, 40);
        assert_eq!(store.phase(), BalancePhase::Reconciled);
    }

    #[test]
    fn test_reconcile_keeps_optimistic_when_server_lags() {
        let store = store_with(12, 30);
        store.begin_claim(10).unwrap();
        // Server echoes the pre-claim value; optimistic decrement stands
        let available = store.finish_claim(Some(12), None);
        assert_eq!(available, 2);
    }

    #[test]
    fn test_abort_restores_pre_claim() {
        let store = store_with(7, 20);
        store.begin_claim(5).unwrap();
        store.abort_claim();
        assert_eq!(store.snapshot().available_points, 7);
        assert_eq!(store.phase(), BalancePhase::Clean);
    }

    #[test]
    fn test_fetch_after_reconcile_returns_to_clean() {
        let store = store_with(12, 30);
        store.begin_claim(10).unwrap();
        store.finish_claim(Some(2), Some(40));

        store.apply_fetch(PointsBalance::from_counts(2, 40));
        assert_eq!(store.phase(), BalancePhase::Clean);
    }

    #[test]
    fn test_counters_never_negative() {
        let store = store_with(3, 5);
        store.begin_claim(10).unwrap();
        assert_eq!(store.snapshot().available_points, 0);
        let available = store.finish_claim(None, None);
        assert_eq!(available, 0);
    }
}
