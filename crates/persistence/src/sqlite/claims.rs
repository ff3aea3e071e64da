//! Last-claim record persistence (single-consumption cross-view token)

use crate::sqlite::settings::{set_setting, take_setting};
use chrono::Utc;
use shake_core::{Error, LastClaimRecord, Result};
use sqlx::SqlitePool;
use tracing::debug;

const LAST_CLAIM_KEY: &str = "lastClaimResult";

/// Persist the record written right after a claim
pub async fn save_last_claim(pool: &SqlitePool, record: &LastClaimRecord) -> Result<()> {
    let json = serde_json::to_string(record).map_err(|e| Error::InvalidData(e.to_string()))?;
    set_setting(pool, LAST_CLAIM_KEY, &json).await
}

/// Consume the last-claim record: read it, delete it, and return it only
/// when it belongs to `email` and is still inside the validity window.
/// The record is deleted even when it doesn't apply, so a stale entry
/// can never resurface on a later mount.
pub async fn take_last_claim(pool: &SqlitePool, email: &str) -> Result<Option<LastClaimRecord>> {
    let Some(json) = take_setting(pool, LAST_CLAIM_KEY).await? else {
        return Ok(None);
    };

    let record: LastClaimRecord = match serde_json::from_str(&json) {
        Ok(r) => r,
        Err(e) => {
            debug!("Discarding unparsable last-claim record: {}", e);
            return Ok(None);
        }
    };

    if record.is_applicable(email, Utc::now()) {
        Ok(Some(record))
    } else {
        debug!("Discarding stale or foreign last-claim record");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::Duration;

    fn record_for(email: &str) -> LastClaimRecord {
        LastClaimRecord {
            email: email.to_string(),
            points_claimed: 10,
            available_points: 2,
            new_total_points: Some(31),
            redemption: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_take_matching_record() {
        let db = Database::connect_in_memory().await.unwrap();
        save_last_claim(db.pool(), &record_for("a@b.com")).await.unwrap();

        let taken = take_last_claim(db.pool(), "a@b.com").await.unwrap().unwrap();
        assert_eq!(taken.points_claimed, 10);

        // Consumed: a second mount sees nothing
        assert!(take_last_claim(db.pool(), "a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_foreign_email_not_applied_but_consumed() {
        let db = Database::connect_in_memory().await.unwrap();
        save_last_claim(db.pool(), &record_for("a@b.com")).await.unwrap();

        assert!(take_last_claim(db.pool(), "other@b.com").await.unwrap().is_none());
        // Deleted regardless, so the right user can't pick it up later either
        assert!(take_last_claim(db.pool(), "a@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_record_not_applied() {
        let db = Database::connect_in_memory().await.unwrap();
        let mut record = record_for("a@b.com");
        record.timestamp = Utc::now()
            - Duration::seconds(shake_core::CLAIM_RECORD_VALIDITY_SECS + 5);
        save_last_claim(db.pool(), &record).await.unwrap();

        assert!(take_last_claim(db.pool(), "a@b.com").await.unwrap().is_none());
    }
}
