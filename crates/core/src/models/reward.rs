//! Reward definitions and tier selection

use serde::{Deserialize, Serialize};

/// A reward tier an available-points balance can redeem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDefinition {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub tier: String,
    /// Points required to redeem (positive)
    #[serde(alias = "pointsRequired")]
    pub cost: u32,
}

/// Response from `GET /rewards/definitions`
#[derive(Debug, Clone, Deserialize)]
pub struct RewardDefinitionsResponse {
    #[serde(default, alias = "definitions")]
    pub rewards: Vec<RewardDefinition>,
}

/// Fixed local ladder used when the backend's definitions are unreachable
pub fn fallback_ladder() -> Vec<RewardDefinition> {
    let tiers = [
        ("RM1 Credit", "credit", 1u32),
        ("RM5 Voucher", "voucher", 5),
        ("RM10 Voucher", "voucher", 10),
        ("RM20 Voucher", "voucher", 20),
        ("RM40 Voucher", "voucher", 40),
    ];
    tiers
        .iter()
        .map(|(title, tier, cost)| RewardDefinition {
            id: format!("local-{cost}"),
            title: title.to_string(),
            tier: tier.to_string(),
            cost: *cost,
        })
        .collect()
}

/// Pick the most expensive definition affordable within `available` points.
/// Returns `None` when nothing is affordable (or the set is empty).
pub fn select_reward(definitions: &[RewardDefinition], available: u32) -> Option<&RewardDefinition> {
    definitions
        .iter()
        .filter(|d| d.cost > 0 && d.cost <= available)
        .max_by_key(|d| d.cost)
}

/// Map a claimed point count onto the fixed threshold table, used when
/// no reward definitions are loaded at claim time.
pub fn threshold_reward(points_claimed: u32) -> &'static str {
    match points_claimed {
        0 => "No reward",
        1..=4 => "RM3 voucher",
        5..=9 => "RM6 voucher",
        10..=19 => "RM8 credit",
        20..=29 => "RM13 credit",
        30..=39 => "Keychain",
        40..=49 => "Plushie",
        _ => "Special prize",
    }
}
