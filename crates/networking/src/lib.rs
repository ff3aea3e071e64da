//! Shake Networking - HTTP client and API wrappers

pub mod api;
pub mod http;

pub use http::{AuthTokens, RewardsClient, DEFAULT_BASE_URL};
