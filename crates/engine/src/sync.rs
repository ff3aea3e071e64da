//! Background balance synchronizer
//!
//! A persistent Tokio task that polls the backend for the signed-in
//! user's points on a fixed interval, falls back to the local ledger
//! when the network is down, and suspends itself after an authorization
//! failure until a fresh bearer token arrives.

use crate::balance::BalanceStore;
use crate::events::{EventBus, RewardsEvent};
use shake_core::{Error, FetchStatus, PointsBalance};
use shake_networking::api::rewards::fetch_points;
use shake_networking::RewardsClient;
use shake_persistence::sqlite::ledger::load_ledger;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default polling interval in seconds
const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Window after a reconciled claim during which poll results are
/// dropped, so a server that hasn't caught up yet can't flash the
/// pre-claim balance back onto the screen
const POST_CLAIM_GRACE_SECS: u64 = 10;

/// Status of the synchronizer task
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncStatus {
    Running,
    Paused,
    /// Auth failure; waiting for a new bearer token before polling again
    Suspended,
    Stopped,
}

/// Handle to control the synchronizer from the rest of the app
#[derive(Clone)]
pub struct SyncHandle {
    pause_tx: watch::Sender<bool>,
    cancel_token: CancellationToken,
    refresh: Arc<Notify>,
    status: Arc<tokio::sync::RwLock<SyncStatus>>,
}

impl SyncHandle {
    /// Pause polling (the task stays alive)
    pub async fn pause(&self) {
        let _ = self.pause_tx.send(true);
        *self.status.write().await = SyncStatus::Paused;
        info!("Balance synchronizer paused");
    }

    /// Resume polling
    pub async fn resume(&self) {
        let _ = self.pause_tx.send(false);
        *self.status.write().await = SyncStatus::Running;
        info!("Balance synchronizer resumed");
    }

    /// Stop the task entirely (cannot be restarted, spawn a new one)
    pub async fn stop(&self) {
        self.cancel_token.cancel();
        *self.status.write().await = SyncStatus::Stopped;
        info!("Balance synchronizer stopped");
    }

    /// Trigger an out-of-band fetch without waiting for the next tick
    pub fn refresh_now(&self) {
        self.refresh.notify_one();
    }

    pub async fn status(&self) -> SyncStatus {
        *self.status.read().await
    }

    pub async fn is_paused(&self) -> bool {
        *self.pause_tx.borrow()
    }
}

/// Spawn the balance synchronizer for a signed-in user.
///
/// Performs one immediate fetch, then polls every
/// [`DEFAULT_INTERVAL_SECS`] seconds. Returns a handle to control
/// pause/resume/stop and to request immediate refreshes.
pub fn spawn_balance_synchronizer(
    client: Arc<RewardsClient>,
    pool: SqlitePool,
    email: String,
    balance: Arc<BalanceStore>,
    events: EventBus,
) -> SyncHandle {
    let (pause_tx, pause_rx) = watch::channel(false);
    let cancel_token = CancellationToken::new();
    let refresh = Arc::new(Notify::new());
    let status = Arc::new(tokio::sync::RwLock::new(SyncStatus::Running));

    let handle = SyncHandle {
        pause_tx,
        cancel_token: cancel_token.clone(),
        refresh: refresh.clone(),
        status: status.clone(),
    };

    tokio::spawn(synchronizer_loop(
        client,
        pool,
        email,
        balance,
        events,
        pause_rx,
        cancel_token,
        refresh,
        status,
    ));

    handle
}

#[allow(clippy::too_many_arguments)]
async fn synchronizer_loop(
    client: Arc<RewardsClient>,
    pool: SqlitePool,
    email: String,
    balance: Arc<BalanceStore>,
    events: EventBus,
    mut pause_rx: watch::Receiver<bool>,
    cancel_token: CancellationToken,
    refresh: Arc<Notify>,
    status: Arc<tokio::sync::RwLock<SyncStatus>>,
) {
    info!(
        "Balance synchronizer started for {} (interval: {}s)",
        email, DEFAULT_INTERVAL_SECS
    );

    let mut auth_rx = client.auth().subscribe();
    let mut bus_rx = events.subscribe();
    let mut suppress_until: Option<Instant> = None;
    let mut suspended = false;

    // Immediate first fetch so the UI doesn't sit on zeros for a tick
    run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Balance synchronizer cancelled, exiting");
                break;
            }
            _ = tokio::time::sleep(Duration::from_secs(DEFAULT_INTERVAL_SECS)) => {
                if *pause_rx.borrow() {
                    debug!("Synchronizer is paused, skipping tick");
                    continue;
                }
                if suspended {
                    debug!("Synchronizer is suspended, waiting for a new token");
                    continue;
                }
                if let Some(until) = suppress_until {
                    if Instant::now() < until {
                        debug!("Within post-claim grace window, skipping tick");
                        continue;
                    }
                    suppress_until = None;
                }
                run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;
            }
            _ = refresh.notified() => {
                if !*pause_rx.borrow() {
                    suppress_until = None;
                    run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;
                }
            }
            // Wake when pause state changes so resume takes effect immediately
            _ = pause_rx.changed() => {
                if !*pause_rx.borrow() && !suspended {
                    run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;
                }
            }
            // A fresh bearer token lifts a suspension
            changed = auth_rx.changed() => {
                if changed.is_err() {
                    continue;
                }
                if suspended && auth_rx.borrow_and_update().is_some() {
                    info!("New bearer token available, resuming synchronizer");
                    suspended = false;
                    *status.write().await = SyncStatus::Running;
                    run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;
                }
            }
            event = bus_rx.recv() => {
                if let Ok(RewardsEvent::PointsUpdated { popup_shown, .. }) = event {
                    if popup_shown {
                        // Local claim: the server may lag behind the
                        // reconciled value, so hold the pollers off
                        suppress_until = Some(Instant::now() + Duration::from_secs(POST_CLAIM_GRACE_SECS));
                        debug!("Claim reconciled, suppressing polls for {}s", POST_CLAIM_GRACE_SECS);
                    } else if !*pause_rx.borrow() && !suspended {
                        // Another view applied a claim record; confirm it
                        run_sync_tick(&client, &pool, &email, &balance, &events, &status, &mut suspended).await;
                    }
                }
            }
        }
    }

    *status.write().await = SyncStatus::Stopped;
    info!("Balance synchronizer loop exited");
}

/// One fetch attempt with ledger fallback and suspension handling
async fn run_sync_tick(
    client: &RewardsClient,
    pool: &SqlitePool,
    email: &str,
    balance: &BalanceStore,
    events: &EventBus,
    status: &tokio::sync::RwLock<SyncStatus>,
    suspended: &mut bool,
) {
    let fetched = match fetch_points(client, email).await {
        Ok((available, total)) => {
            debug!(available, total, "Balance fetched");
            PointsBalance::from_counts(available, total)
        }
        Err(Error::Unauthorized) | Err(Error::TokenExpired) => {
            warn!("Balance fetch unauthorized, suspending synchronizer");
            *suspended = true;
            *status.write().await = SyncStatus::Suspended;
            ledger_fallback(pool, email, FetchStatus::Unauthorized).await
        }
        Err(Error::Timeout) => {
            warn!("Balance fetch timed out, using local ledger");
            ledger_fallback(pool, email, FetchStatus::Timeout).await
        }
        Err(Error::NoIdentifier) => PointsBalance::empty(FetchStatus::NoIdentifier),
        Err(e) => {
            warn!("Balance fetch failed ({}), using local ledger", e);
            ledger_fallback(pool, email, FetchStatus::NetworkError).await
        }
    };

    balance.apply_fetch(fetched);
    events.publish(RewardsEvent::BalanceFetched {
        email: email.to_string(),
        balance: balance.snapshot(),
    });
}

/// Build a balance snapshot from the local ledger, stamped with the
/// failure status that forced the fallback
async fn ledger_fallback(pool: &SqlitePool, email: &str, reason: FetchStatus) -> PointsBalance {
    match load_ledger(pool, email).await {
        Ok(ledger) => {
            PointsBalance::from_counts(ledger.available_points, ledger.total_points)
                .with_status(reason)
        }
        Err(e) => {
            warn!("Ledger fallback unavailable: {}", e);
            PointsBalance::empty(reason)
        }
    }
}
