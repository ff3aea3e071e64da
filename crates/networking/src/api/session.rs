//! Session and admin auth operations

use crate::RewardsClient;
use shake_core::{AdminLoginResponse, Result, SessionExchangeResponse};

/// Exchange an identity-provider token for a backend session token
pub async fn exchange_session(
    client: &RewardsClient,
    id_token: &str,
) -> Result<SessionExchangeResponse> {
    client.exchange_session(id_token).await
}

/// Check admin credentials (unrelated to the points flow; kept for the
/// admin dashboard entry point)
pub async fn verify_admin(
    client: &RewardsClient,
    username: &str,
    password: &str,
) -> Result<AdminLoginResponse> {
    client.verify_admin(username, password).await
}
