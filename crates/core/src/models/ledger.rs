//! Local fallback points ledger (degraded-mode store)
//!
//! Pure data + mutation logic; persistence of the blob lives in the
//! persistence crate. Consulted only when the backend is unreachable
//! or unauthorized, never as the primary source of truth.

use crate::errors::{Error, Result};
use crate::types::ActionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Most recent actions kept in history
pub const ACTION_HISTORY_CAP: usize = 50;
/// Most recent claims kept in history
pub const CLAIM_HISTORY_CAP: usize = 20;

/// A point-earning action recorded locally
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAction {
    pub kind: ActionKind,
    pub points: u32,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub details: Value,
}

/// A claim recorded locally
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerClaim {
    pub points_claimed: u32,
    pub total_after_claim: u32,
    pub timestamp: DateTime<Utc>,
}

/// Per-user fallback ledger, persisted as one JSON blob
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LedgerData {
    pub total_points: u32,
    pub available_points: u32,
    pub action_history: Vec<LedgerAction>,
    pub claim_history: Vec<LedgerClaim>,
}

impl LedgerData {
    /// Move up to `points_to_claim` from available to total.
    /// Fails with `NothingToClaim` when nothing is available.
    pub fn claim(&mut self, points_to_claim: u32) -> Result<LedgerClaim> {
        if self.available_points == 0 {
            return Err(Error::NothingToClaim);
        }

        let claimed = points_to_claim.min(self.available_points);
        self.available_points -= claimed;
        self.total_points += claimed;

        let record = LedgerClaim {
            points_claimed: claimed,
            total_after_claim: self.total_points,
            timestamp: Utc::now(),
        };
        self.claim_history.insert(0, record.clone());
        self.claim_history.truncate(CLAIM_HISTORY_CAP);

        Ok(record)
    }

    /// Credit points for an earn action and record it
    pub fn record_action(&mut self, kind: ActionKind, details: Value) -> LedgerAction {
        let points = kind.points_awarded();
        self.available_points += points;

        let description = match kind {
            ActionKind::Trade => format!(
                "Trade executed: {}",
                details
                    .get("pair")
                    .and_then(Value::as_str)
                    .unwrap_or("BTC/USD")
            ),
            ActionKind::Share => format!(
                "Shared {} on social media",
                details
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or("app")
            ),
        };

        let action = LedgerAction {
            kind,
            points,
            description,
            timestamp: Utc::now(),
            details,
        };
        self.action_history.insert(0, action.clone());
        self.action_history.truncate(ACTION_HISTORY_CAP);

        action
    }

    /// Most recent actions (newest first)
    pub fn recent_actions(&self, limit: usize) -> &[LedgerAction] {
        &self.action_history[..limit.min(self.action_history.len())]
    }

    /// Most recent claims (newest first)
    pub fn recent_claims(&self, limit: usize) -> &[LedgerClaim] {
        &self.claim_history[..limit.min(self.claim_history.len())]
    }
}
