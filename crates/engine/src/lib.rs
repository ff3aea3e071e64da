//! Shake Engine - Balance synchronization, claim coordination, and triggers

pub mod actions;
pub mod balance;
pub mod coordinator;
pub mod events;
pub mod shake;
pub mod sync;

pub use balance::{BalancePhase, BalanceStore};
pub use coordinator::ClaimCoordinator;
pub use events::{EventBus, RewardsEvent};
pub use shake::{MotionSample, ShakeDetector};
pub use sync::{spawn_balance_synchronizer, SyncHandle, SyncStatus};
