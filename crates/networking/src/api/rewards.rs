//! Balance, definition, and claim operations with validation

use crate::RewardsClient;
use shake_core::{
    fallback_ladder, ClaimOutcome, ClaimRequest, Error, Result, RewardDefinition,
};
use tracing::{debug, warn};

/// Fetch the `(available, total)` counters for a user.
///
/// An empty identifier short-circuits with `NoIdentifier` and performs
/// no network call.
pub async fn fetch_points(client: &RewardsClient, email: &str) -> Result<(u32, u32)> {
    if email.trim().is_empty() {
        return Err(Error::NoIdentifier);
    }
    client.fetch_balance(email).await
}

/// Fetch reward definitions, falling back to the fixed local ladder
/// when the backend is unreachable or returns an empty set.
pub async fn fetch_definitions(client: &RewardsClient) -> Vec<RewardDefinition> {
    match client.get_definitions().await {
        Ok(defs) if !defs.is_empty() => defs,
        Ok(_) => {
            debug!("Backend returned no reward definitions, using local ladder");
            fallback_ladder()
        }
        Err(e) => {
            warn!("Definitions fetch failed ({}), using local ladder", e);
            fallback_ladder()
        }
    }
}

/// Execute a claim
pub async fn claim_points(client: &RewardsClient, request: &ClaimRequest) -> Result<ClaimOutcome> {
    if request.email.trim().is_empty() {
        return Err(Error::NoIdentifier);
    }
    client.claim(request).await
}
