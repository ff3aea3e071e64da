//! Shared type definitions and newtypes

use serde::{Deserialize, Serialize};

/// Reward points (for clarity in function signatures)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Points(pub u32);

impl Points {
    pub fn new(amount: u32) -> Self {
        Points(amount)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Subtract without going below zero (balances are never negative)
    pub fn saturating_sub(&self, other: Points) -> Points {
        Points(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Points {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} pts", self.0)
    }
}

/// Point-earning action kinds recognized by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Trade,
    Share,
}

impl ActionKind {
    /// Fixed per-action point award
    pub fn points_awarded(&self) -> u32 {
        match self {
            ActionKind::Trade => 1,
            ActionKind::Share => 2,
        }
    }

    /// Backend notification path for this action
    pub fn endpoint(&self) -> &'static str {
        match self {
            ActionKind::Trade => "/trade",
            ActionKind::Share => "/share",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Trade => "trade",
            ActionKind::Share => "share",
        }
    }
}
