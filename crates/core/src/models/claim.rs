//! Claim request/response models, redemptions, and reconciliation

use crate::models::balance::coerce_count;
use crate::models::reward::RewardDefinition;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How long a persisted last-claim record stays applicable on mount.
/// The source history carried both 2 minutes and 10 seconds; unified here.
pub const CLAIM_RECORD_VALIDITY_SECS: i64 = 120;

/// Request body for `POST /shake`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_to_claim: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_chosen: Option<bool>,
}

impl ClaimRequest {
    /// Minimal request letting the server choose the reward
    pub fn server_chosen(email: &str) -> Self {
        Self {
            email: email.to_string(),
            points_to_claim: None,
            reward_id: None,
            cost: None,
            client_chosen: None,
        }
    }

    /// Request carrying a client-selected reward definition
    pub fn client_selected(email: &str, def: &RewardDefinition) -> Self {
        Self {
            email: email.to_string(),
            points_to_claim: Some(def.cost),
            reward_id: Some(def.id.clone()),
            cost: Some(def.cost),
            client_chosen: Some(true),
        }
    }
}

/// The result of a successful claim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    /// Points consumed
    pub cost: u32,
    #[serde(default)]
    pub tier: String,
    /// The definition redeemed (absent when the server only names a prize)
    #[serde(default)]
    pub reward_def: Option<RewardDefinition>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Redemption {
    /// Synthesize a redemption from a client-selected definition
    pub fn from_definition(def: &RewardDefinition) -> Self {
        Self {
            cost: def.cost,
            tier: def.tier.clone(),
            reward_def: Some(def.clone()),
            timestamp: Some(Utc::now()),
        }
    }
}

/// Parsed `POST /shake` response.
///
/// The backend has returned several shapes over time, so the numeric
/// fields go through the same lenient coercion as the balance fetch and
/// the reward label is resolved against an ordered alias list.
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub points_claimed: u32,
    /// Post-claim available balance, when the server supplied a numeric one
    pub available_points: Option<u32>,
    pub new_total_points: Option<u32>,
    /// Server-provided redemption object, if any
    pub redemption: Option<Redemption>,
    /// Display label for the reward (server wording preferred)
    pub reward_label: Option<String>,
    pub raw: Value,
}

impl ClaimOutcome {
    /// Parse a raw claim response body
    pub fn parse(body: Value) -> Self {
        let points_claimed = body
            .get("pointsClaimed")
            .and_then(coerce_count)
            .unwrap_or(0);
        let available_points = body.get("availablePoints").and_then(coerce_count);
        let new_total_points = body.get("newTotalPoints").and_then(coerce_count);
        let redemption = body
            .get("redemption")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        let reward_label = extract_reward_label(&body);

        Self {
            points_claimed,
            available_points,
            new_total_points,
            redemption,
            reward_label,
            raw: body,
        }
    }
}

/// Resolve a display label for the reward from the known response aliases
fn extract_reward_label(body: &Value) -> Option<String> {
    let direct = ["reward", "rewardName", "prize"];
    for key in direct {
        if let Some(s) = body.get(key).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    if let Some(first) = body.get("rewards").and_then(|r| r.get(0)) {
        for key in ["name", "label"] {
            if let Some(s) = first.get(key).and_then(Value::as_str) {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    if let Some(raw) = body.get("raw") {
        for key in ["reward", "prize", "name"] {
            if let Some(s) = raw.get(key).and_then(Value::as_str) {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Reconciliation rule for an optimistic claim: the server value is
/// authoritative only when it shows a decrease from the pre-claim balance;
/// otherwise the optimistic local decrement stands.
pub fn reconcile_available(pre_claim: u32, server: Option<u32>, local_delta: u32) -> u32 {
    match server {
        Some(v) if v < pre_claim => v,
        _ => pre_claim.saturating_sub(local_delta),
    }
}

/// Short-lived cross-view consistency record persisted after a claim
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastClaimRecord {
    pub email: String,
    pub points_claimed: u32,
    /// Post-claim available balance
    pub available_points: u32,
    #[serde(default)]
    pub new_total_points: Option<u32>,
    #[serde(default)]
    pub redemption: Option<Redemption>,
    pub timestamp: DateTime<Utc>,
}

impl LastClaimRecord {
    /// Whether a record applies to this user at this moment: same email
    /// and younger than the validity window.
    pub fn is_applicable(&self, email: &str, now: DateTime<Utc>) -> bool {
        self.email == email
            && now.signed_duration_since(self.timestamp)
                < Duration::seconds(CLAIM_RECORD_VALIDITY_SECS)
            && now >= self.timestamp - Duration::seconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reconcile_server_decrease_wins() {
        assert_eq!(reconcile_available(12, Some(1), 10), 1);
    }

    #[test]
    fn test_reconcile_server_equal_keeps_optimistic() {
        // server hasn't caught up yet; the local decrement stands
        assert_eq!(reconcile_available(12, Some(12), 10), 2);
    }

    #[test]
    fn test_reconcile_server_higher_keeps_optimistic() {
        assert_eq!(reconcile_available(12, Some(20), 10), 2);
    }

    #[test]
    fn test_reconcile_missing_server_value() {
        assert_eq!(reconcile_available(5, None, 3), 2);
    }

    #[test]
    fn test_reconcile_never_negative() {
        assert_eq!(reconcile_available(2, None, 10), 0);
    }

    #[test]
    fn test_outcome_parses_numeric_strings() {
        let outcome = ClaimOutcome::parse(json!({
            "pointsClaimed": "10",
            "availablePoints": 2,
            "newTotalPoints": "31"
        }));
        assert_eq!(outcome.points_claimed, 10);
        assert_eq!(outcome.available_points, Some(2));
        assert_eq!(outcome.new_total_points, Some(31));
    }

    #[test]
    fn test_outcome_missing_available_is_none() {
        let outcome = ClaimOutcome::parse(json!({"pointsClaimed": 3}));
        assert_eq!(outcome.available_points, None);
    }

    #[test]
    fn test_reward_label_alias_order() {
        let outcome = ClaimOutcome::parse(json!({
            "reward": "RM5 Voucher",
            "prize": "should not win"
        }));
        assert_eq!(outcome.reward_label.as_deref(), Some("RM5 Voucher"));

        let outcome = ClaimOutcome::parse(json!({
            "rewards": [{"name": "Keychain"}]
        }));
        assert_eq!(outcome.reward_label.as_deref(), Some("Keychain"));
    }

    #[test]
    fn test_server_redemption_parsed() {
        let outcome = ClaimOutcome::parse(json!({
            "pointsClaimed": 10,
            "redemption": {"cost": 10, "tier": "voucher"}
        }));
        let r = outcome.redemption.unwrap();
        assert_eq!(r.cost, 10);
        assert_eq!(r.tier, "voucher");
    }

    #[test]
    fn test_record_applicability_window() {
        let record = LastClaimRecord {
            email: "a@example.com".into(),
            points_claimed: 5,
            available_points: 0,
            new_total_points: Some(25),
            redemption: None,
            timestamp: Utc::now(),
        };
        let now = Utc::now();
        assert!(record.is_applicable("a@example.com", now));
        // Different email never applies
        assert!(!record.is_applicable("b@example.com", now));
        // Stale record never applies
        let later = now + Duration::seconds(CLAIM_RECORD_VALIDITY_SECS + 1);
        assert!(!record.is_applicable("a@example.com", later));
    }
}
