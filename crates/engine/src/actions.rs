//! Point-earning actions (trade, share)
//!
//! Earn actions are ledger-first: the local ledger is credited and
//! persisted before the backend hears about it, so points survive a
//! dead network. The backend notification is fire-and-forget.

use shake_core::{ActionKind, LedgerAction, LedgerClaim, Result};
use shake_networking::RewardsClient;
use shake_persistence::sqlite::ledger::{claim_from_ledger, record_ledger_action};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

/// Record an earn action in the local ledger and notify the backend
/// in the background. Returns the persisted ledger entry.
pub async fn perform_action(
    client: &Arc<RewardsClient>,
    pool: &SqlitePool,
    email: &str,
    kind: ActionKind,
    details: serde_json::Value,
) -> Result<LedgerAction> {
    let action = record_ledger_action(pool, email, kind, details.clone()).await?;
    debug!(
        kind = kind.as_str(),
        points = action.points,
        "Action credited locally"
    );

    // Best effort; the ledger entry already holds the points
    let client = client.clone();
    let email = email.to_string();
    tokio::spawn(async move {
        if let Err(e) = client.notify_action(&email, kind, &details).await {
            warn!("Backend notify for {} failed: {}", kind.as_str(), e);
        }
    });

    Ok(action)
}

/// Simulate a trade and credit its point
pub async fn perform_trade(
    client: &Arc<RewardsClient>,
    pool: &SqlitePool,
    email: &str,
    pair: &str,
) -> Result<LedgerAction> {
    perform_action(
        client,
        pool,
        email,
        ActionKind::Trade,
        serde_json::json!({ "pair": pair }),
    )
    .await
}

/// Record a social share and credit its points
pub async fn perform_share(
    client: &Arc<RewardsClient>,
    pool: &SqlitePool,
    email: &str,
    content: &str,
) -> Result<LedgerAction> {
    perform_action(
        client,
        pool,
        email,
        ActionKind::Share,
        serde_json::json!({ "content": content }),
    )
    .await
}

/// Claim from the local fallback ledger. Degraded-mode only: locally
/// earned points are moved to the total without touching the backend.
pub async fn claim_local(pool: &SqlitePool, email: &str, points: u32) -> Result<LedgerClaim> {
    let claim = claim_from_ledger(pool, email, points).await?;
    debug!(
        points_claimed = claim.points_claimed,
        total = claim.total_after_claim,
        "Claimed from local ledger"
    );
    Ok(claim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shake_networking::AuthTokens;
    use shake_persistence::sqlite::ledger::load_ledger;
    use shake_persistence::Database;

    fn offline_client() -> Arc<RewardsClient> {
        // Points to nothing routable; the background notify just fails
        Arc::new(RewardsClient::new(
            "http://127.0.0.1:1",
            Arc::new(AuthTokens::new(None, None)),
        ))
    }

    #[tokio::test]
    async fn test_trade_credits_ledger_before_network() {
        let db = Database::connect_in_memory().await.unwrap();
        let client = offline_client();

        let action = perform_trade(&client, db.pool(), "user@example.com", "ETH/USD")
            .await
            .unwrap();
        assert_eq!(action.points, 1);
        assert!(action.description.contains("ETH/USD"));

        let ledger = load_ledger(db.pool(), "user@example.com").await.unwrap();
        assert_eq!(ledger.available_points, 1);
        assert_eq!(ledger.action_history.len(), 1);
    }

    #[tokio::test]
    async fn test_share_awards_two_points() {
        let db = Database::connect_in_memory().await.unwrap();
        let client = offline_client();

        let action = perform_share(&client, db.pool(), "user@example.com", "leaderboard")
            .await
            .unwrap();
        assert_eq!(action.points, 2);

        let ledger = load_ledger(db.pool(), "user@example.com").await.unwrap();
        assert_eq!(ledger.available_points, 2);
    }
}
