//! Claim coordination: optimistic decrement, server call, reconciliation
//!
//! A claim either fully succeeds on the backend or consumes nothing
//! locally. The optimistic decrement is applied before the request goes
//! out and rolled back on any failure; there is no local fallback credit
//! for a failed claim.

use crate::balance::BalanceStore;
use crate::events::{EventBus, RewardsEvent};
use shake_core::{
    select_reward, threshold_reward, ClaimRequest, Error, LastClaimRecord, Redemption, Result,
    RewardDefinition,
};
use shake_networking::api::rewards::{claim_points, fetch_definitions};
use shake_networking::RewardsClient;
use shake_persistence::sqlite::claims::save_last_claim;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// What a claim will send and what it expects to consume
#[derive(Debug, Clone)]
pub struct ClaimPlan {
    pub request: ClaimRequest,
    /// Points decremented optimistically before the response arrives
    pub delta: u32,
    /// Locally selected definition, when the ladder offered one
    pub selected: Option<RewardDefinition>,
}

/// Build the claim plan for a given balance. An explicit override claims
/// that many points (capped at the balance) with the server choosing the
/// prize. Otherwise, when the definition ladder offers an affordable
/// reward the client selects it; failing that, all available points go
/// out and the server picks.
pub fn plan_claim(
    email: &str,
    definitions: &[RewardDefinition],
    available: u32,
    override_points: Option<u32>,
) -> ClaimPlan {
    if let Some(points) = override_points {
        let delta = points.min(available);
        let mut request = ClaimRequest::server_chosen(email);
        request.points_to_claim = Some(delta);
        return ClaimPlan {
            request,
            delta,
            selected: None,
        };
    }

    match select_reward(definitions, available) {
        Some(def) => ClaimPlan {
            request: ClaimRequest::client_selected(email, def),
            delta: def.cost,
            selected: Some(def.clone()),
        },
        None => ClaimPlan {
            request: ClaimRequest::server_chosen(email),
            delta: available,
            selected: None,
        },
    }
}

/// Serializes claims and ties the balance store, the HTTP client, and
/// the persisted last-claim record together
pub struct ClaimCoordinator {
    client: Arc<RewardsClient>,
    balance: Arc<BalanceStore>,
    events: EventBus,
    in_flight: AtomicBool,
}

impl ClaimCoordinator {
    pub fn new(client: Arc<RewardsClient>, balance: Arc<BalanceStore>, events: EventBus) -> Self {
        Self {
            client,
            balance,
            events,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_claiming(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Run a full claim for `email`. Exactly one claim may be in flight
    /// at a time; a second call returns `ClaimInProgress` immediately.
    #[instrument(skip(self, pool))]
    pub async fn claim(
        &self,
        pool: &SqlitePool,
        email: &str,
        override_points: Option<u32>,
    ) -> Result<LastClaimRecord> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::ClaimInProgress);
        }

        let result = self.claim_inner(pool, email, override_points).await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn claim_inner(
        &self,
        pool: &SqlitePool,
        email: &str,
        override_points: Option<u32>,
    ) -> Result<LastClaimRecord> {
        let available = self.balance.snapshot().available_points;
        if available == 0 {
            return Err(Error::NothingToClaim);
        }

        let definitions = fetch_definitions(&self.client).await;
        let plan = plan_claim(email, &definitions, available, override_points);
        debug!(delta = plan.delta, "Starting claim");

        self.balance.begin_claim(plan.delta)?;
        self.events.publish(RewardsEvent::Redeeming {
            email: email.to_string(),
        });

        let outcome = match claim_points(&self.client, &plan.request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.balance.abort_claim();
                warn!("Claim failed, restored pre-claim balance: {}", e);
                self.events.publish(RewardsEvent::ClaimFailed {
                    email: email.to_string(),
                    reason: e.to_string(),
                });
                return Err(e);
            }
        };

        let reconciled =
            self.balance
                .finish_claim(outcome.available_points, outcome.new_total_points);

        let points_claimed = if outcome.points_claimed > 0 {
            outcome.points_claimed
        } else {
            plan.delta
        };
        let redemption = outcome
            .redemption
            .clone()
            .or_else(|| plan.selected.as_ref().map(Redemption::from_definition));
        let reward_label = outcome
            .reward_label
            .clone()
            .or_else(|| plan.selected.as_ref().map(|d| d.title.clone()))
            .unwrap_or_else(|| threshold_reward(points_claimed).to_string());
        debug!(points_claimed, reward = %reward_label, "Claim reconciled");

        let record = LastClaimRecord {
            email: email.to_string(),
            points_claimed,
            available_points: reconciled,
            new_total_points: outcome.new_total_points,
            redemption,
            timestamp: chrono::Utc::now(),
        };

        // The balance is already reconciled in memory; a persistence
        // hiccup only loses the cross-view record.
        if let Err(e) = save_last_claim(pool, &record).await {
            warn!("Failed to persist last-claim record: {}", e);
        }

        self.events.publish(RewardsEvent::PointsUpdated {
            record: record.clone(),
            popup_shown: true,
        });

        Ok(record)
    }
}
