//! In-process event bus for cross-view notifications
//!
//! Replaces ad hoc global flags: every component that needs to react to
//! a claim or a fetch subscribes here, and nothing reaches into ambient
//! state.

use shake_core::{LastClaimRecord, PointsBalance};
use tokio::sync::broadcast;

/// Events published by the synchronizer and the claim coordinator
#[derive(Debug, Clone)]
pub enum RewardsEvent {
    /// A balance fetch completed (any status)
    BalanceFetched {
        email: String,
        balance: PointsBalance,
    },
    /// A claim is in flight; the optimistic decrement is already visible
    Redeeming { email: String },
    /// A claim reconciled; carries the full result so other views can
    /// update without re-polling
    PointsUpdated {
        record: LastClaimRecord,
        /// The originating view already showed the reward popup
        popup_shown: bool,
    },
    /// A claim failed hard; no points were consumed
    ClaimFailed { email: String, reason: String },
}

/// Cloneable handle to the broadcast bus
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RewardsEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publish an event; lagging or absent subscribers are not errors
    pub fn publish(&self, event: RewardsEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RewardsEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(RewardsEvent::Redeeming {
            email: "a@b.com".into(),
        });

        assert!(matches!(rx1.recv().await.unwrap(), RewardsEvent::Redeeming { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), RewardsEvent::Redeeming { .. }));
    }

    #[test]
    fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(RewardsEvent::ClaimFailed {
            email: "a@b.com".into(),
            reason: "timeout".into(),
        });
    }
}
