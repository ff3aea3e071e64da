//! HTTP transport: client and token handling

mod auth;
mod client;

pub use auth::AuthTokens;
pub use client::{RewardsClient, DEFAULT_BASE_URL};
