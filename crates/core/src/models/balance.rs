//! Points balance model and response normalization
//!
//! The backend is admin-managed and has shipped several response shapes
//! for `GET /rewards`. All of them funnel through [`normalize_balance`],
//! which checks a fixed, ordered alias table instead of scattering
//! field-name guesses through the client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outcome of the most recent balance fetch, kept for UI diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    Ok,
    NetworkError,
    Timeout,
    Unauthorized,
    NoIdentifier,
}

/// Authoritative server view of a user's points
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsBalance {
    /// Unclaimed, redeemable points
    pub available_points: u32,
    /// Lifetime accrued points
    pub total_points: u32,
    pub last_fetched_at: DateTime<Utc>,
    pub last_fetch_status: FetchStatus,
}

impl PointsBalance {
    /// Zero balance stamped with the given status
    pub fn empty(status: FetchStatus) -> Self {
        Self {
            available_points: 0,
            total_points: 0,
            last_fetched_at: Utc::now(),
            last_fetch_status: status,
        }
    }

    /// Balance built from raw counters, stamped `Ok`
    pub fn from_counts(available: u32, total: u32) -> Self {
        Self {
            available_points: available,
            total_points: total,
            last_fetched_at: Utc::now(),
            last_fetch_status: FetchStatus::Ok,
        }
    }

    /// Counters with a different status stamp (e.g. ledger fallback)
    pub fn with_status(mut self, status: FetchStatus) -> Self {
        self.last_fetch_status = status;
        self
    }
}

/// Alias priority for the "available" counter, top-level then nested
const AVAILABLE_ALIASES: [&str; 4] = ["availablePoints", "available", "unclaimed", "points"];
/// Alias priority for the "total" counter
const TOTAL_ALIASES: [&str; 2] = ["totalPoints", "total"];

/// Normalize a raw `GET /rewards` response body into `(available, total)`.
///
/// Checks each alias in priority order at the top level, then under a
/// nested `user` object. Values may arrive as JSON numbers or numeric
/// strings; anything unparsable or negative coerces to 0.
pub fn normalize_balance(body: &Value) -> (u32, u32) {
    let available = extract_aliased(body, &AVAILABLE_ALIASES);
    let total = extract_aliased(body, &TOTAL_ALIASES);
    (available, total)
}

fn extract_aliased(body: &Value, aliases: &[&str]) -> u32 {
    // The first alias that is present and non-null wins; an unparsable
    // value there coerces to 0 rather than falling through to a later
    // alias. Null counts as absent.
    for alias in aliases {
        if let Some(v) = body.get(alias) {
            if !v.is_null() {
                return coerce_count(v).unwrap_or(0);
            }
        }
    }
    if let Some(user) = body.get("user") {
        for alias in aliases {
            if let Some(v) = user.get(alias) {
                if !v.is_null() {
                    return coerce_count(v).unwrap_or(0);
                }
            }
        }
    }
    0
}

/// Coerce a JSON value to a non-negative point count (handles number or string)
pub fn coerce_count(v: &Value) -> Option<u32> {
    match v {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.max(0) as u32)
            } else {
                n.as_f64().map(|f| f.max(0.0) as u32)
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| i.max(0) as u32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_available_points() {
        let (a, t) = normalize_balance(&json!({"availablePoints": 7, "totalPoints": 30}));
        assert_eq!((a, t), (7, 30));
    }

    #[test]
    fn test_points_alias_means_available() {
        let (a, t) = normalize_balance(&json!({"points": 4}));
        assert_eq!((a, t), (4, 0));
    }

    #[test]
    fn test_available_alias() {
        let (a, _) = normalize_balance(&json!({"available": 12, "total": 40}));
        assert_eq!(a, 12);
    }

    #[test]
    fn test_unclaimed_alias() {
        let (a, _) = normalize_balance(&json!({"unclaimed": 3}));
        assert_eq!(a, 3);
    }

    #[test]
    fn test_nested_user_object() {
        let (a, t) = normalize_balance(&json!({
            "user": {"availablePoints": 5, "totalPoints": 21}
        }));
        assert_eq!((a, t), (5, 21));
    }

    #[test]
    fn test_alias_priority_prefers_available_points() {
        // availablePoints outranks the generic points field
        let (a, _) = normalize_balance(&json!({"availablePoints": 2, "points": 99}));
        assert_eq!(a, 2);
    }

    #[test]
    fn test_top_level_outranks_nested() {
        let (a, _) = normalize_balance(&json!({
            "points": 6,
            "user": {"availablePoints": 99}
        }));
        assert_eq!(a, 6);
    }

    #[test]
    fn test_numeric_string_coercion() {
        let (a, t) = normalize_balance(&json!({"availablePoints": "8", "totalPoints": "15"}));
        assert_eq!((a, t), (8, 15));
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        let (a, _) = normalize_balance(&json!({"availablePoints": -3}));
        assert_eq!(a, 0);
    }

    #[test]
    fn test_unparsable_value_does_not_fall_through() {
        // "abc" occupies the highest-priority alias, so it coerces to 0
        // instead of handing the lookup to the points field
        let (a, _) = normalize_balance(&json!({"availablePoints": "abc", "points": 5}));
        assert_eq!(a, 0);
    }

    #[test]
    fn test_null_alias_is_treated_as_absent() {
        let (a, _) = normalize_balance(&json!({"availablePoints": null, "points": 5}));
        assert_eq!(a, 5);
    }

    #[test]
    fn test_unrecognized_shape_is_zero() {
        let (a, t) = normalize_balance(&json!({"balance": {"weird": true}}));
        assert_eq!((a, t), (0, 0));
    }

    #[test]
    fn test_identical_extraction_across_shapes() {
        let shapes = [
            json!({"points": 9}),
            json!({"available": 9}),
            json!({"user": {"availablePoints": 9}}),
        ];
        for shape in &shapes {
            assert_eq!(normalize_balance(shape).0, 9, "shape: {shape}");
        }
    }
}
