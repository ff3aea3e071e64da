//! Shake Rewards HTTP client with bearer-token authentication

use chrono::Utc;
use reqwest::{cookie::Jar, Client, RequestBuilder, Response, StatusCode};
use shake_core::{
    normalize_balance, AdminLoginRequest, AdminLoginResponse, ClaimOutcome, ClaimRequest, Error,
    Result, RewardDefinition, RewardDefinitionsResponse, SessionExchangeRequest,
    SessionExchangeResponse,
};
use shake_persistence::cache::DefinitionsCache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument, warn};

/// Production backend, overridable per client
pub const DEFAULT_BASE_URL: &str = "https://minigamebackend.onrender.com";

/// Every request is aborted after this long
const REQUEST_TIMEOUT: Duration = Duration::from_secs(7);

/// HTTP client for the rewards backend.
///
/// Sends `Authorization: Bearer <token>` whenever a token is available
/// and keeps a cookie jar for the cookie-session fallback. On a 401 the
/// client attempts exactly one token refresh (identity-token exchange)
/// and retries once.
pub struct RewardsClient {
    http: Client,
    base_url: String,
    auth: Arc<AuthTokens>,
    /// Optional shared definitions cache
    cache: Option<Arc<DefinitionsCache>>,
}

use super::auth::AuthTokens;

impl RewardsClient {
    /// Create a new client against the given backend base URL
    pub fn new(base_url: &str, auth: Arc<AuthTokens>) -> Self {
        let jar = Arc::new(Jar::default());

        let http = Client::builder()
            .cookie_provider(jar)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
            cache: None,
        }
    }

    /// Create a new client with a shared definitions cache
    pub fn new_with_cache(
        base_url: &str,
        auth: Arc<AuthTokens>,
        cache: Arc<DefinitionsCache>,
    ) -> Self {
        let mut client = Self::new(base_url, auth);
        client.cache = Some(cache);
        client
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the current bearer token, if any
    fn with_bearer(&self, rb: RequestBuilder) -> RequestBuilder {
        match self.auth.bearer() {
            Some(token) => rb.bearer_auth(token),
            None => rb,
        }
    }

    /// Send a request; on 401, refresh the token once and retry once.
    /// A second 401 surfaces as `Error::Unauthorized`.
    async fn send_with_refresh(&self, rb: RequestBuilder) -> Result<Response> {
        let retry = rb
            .try_clone()
            .ok_or_else(|| Error::Unknown("Request body not cloneable".to_string()))?;

        let response = self.with_bearer(rb).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!("401 received, retrying once with refreshed token");
        self.refresh_bearer().await?;

        let response = self.with_bearer(retry).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        Ok(response)
    }

    /// Exchange the stored identity token for a fresh backend bearer token
    async fn refresh_bearer(&self) -> Result<()> {
        let Some(id_token) = self.auth.id_token().await else {
            warn!("No identity token available for refresh");
            return Err(Error::Unauthorized);
        };

        let exchange = self.exchange_session(&id_token).await?;
        match exchange.token {
            Some(token) => {
                self.auth.set_bearer(Some(token));
                Ok(())
            }
            None => Err(Error::AuthenticationError(
                "Session exchange returned no token".to_string(),
            )),
        }
    }

    /// Fetch the authoritative `(available, total)` point counters.
    ///
    /// Adds a cache-busting parameter so intermediaries never serve a
    /// stale balance. The response body goes through the tolerant
    /// normalization in shake-core.
    #[instrument(skip(self))]
    pub async fn fetch_balance(&self, email: &str) -> Result<(u32, u32)> {
        let url = self.url("/rewards");
        debug!("Fetching balance from: {}", url);

        let rb = self
            .http
            .get(&url)
            .query(&[("email", email), ("_", &Utc::now().timestamp_millis().to_string())]);

        let response = self.send_with_refresh(rb).await?;
        debug!("Balance response status: {}", response.status());

        let response = response.error_for_status().map_err(|e| {
            error!("Balance request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let body: serde_json::Value = response.json().await.map_err(|e| {
            error!("Failed to parse balance response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        let (available, total) = normalize_balance(&body);
        debug!("Balance fetched: {} available, {} total", available, total);
        Ok((available, total))
    }

    /// Fetch the reward definition set (cache-aware)
    #[instrument(skip(self))]
    pub async fn get_definitions(&self) -> Result<Vec<RewardDefinition>> {
        if let Some(ref cache) = self.cache {
            if let Some(cached) = cache.get() {
                debug!("Definitions cache hit");
                return Ok(cached);
            }
        }

        let url = self.url("/rewards/definitions");
        let rb = self.http.get(&url);
        let response = self.send_with_refresh(rb).await?;

        let response = response.error_for_status().map_err(|e| {
            error!("Definitions request failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        let parsed: RewardDefinitionsResponse = response.json().await.map_err(|e| {
            error!("Failed to parse definitions response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        debug!("Fetched {} reward definitions", parsed.rewards.len());

        if let Some(ref cache) = self.cache {
            cache.insert(parsed.rewards.clone());
        }

        Ok(parsed.rewards)
    }

    /// Execute a claim via `POST /shake`
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn claim(&self, request: &ClaimRequest) -> Result<ClaimOutcome> {
        let url = self.url("/shake");
        debug!("Executing claim");

        let rb = self.http.post(&url).json(request);
        let response = self.send_with_refresh(rb).await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!("Claim request failed: HTTP {} — {}", status, body);
            return Err(Error::ClaimFailed(format!("HTTP {}: {}", status, body)));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| {
            error!("Failed to parse claim response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        // What's affordable changed; refetch definitions on next use
        if let Some(ref cache) = self.cache {
            cache.invalidate();
        }

        let outcome = ClaimOutcome::parse(body);
        debug!(
            "Claim executed: {} claimed, server available {:?}",
            outcome.points_claimed, outcome.available_points
        );
        Ok(outcome)
    }

    /// Notify the backend of a point-earning action (`POST /trade` or `/share`)
    #[instrument(skip(self, details))]
    pub async fn notify_action(
        &self,
        email: &str,
        action: shake_core::ActionKind,
        details: &serde_json::Value,
    ) -> Result<()> {
        let url = self.url(action.endpoint());
        let body = serde_json::json!({
            "email": email,
            "action": action.as_str(),
            "details": details,
        });

        let rb = self.http.post(&url).json(&body);
        let response = self.send_with_refresh(rb).await?;

        response.error_for_status().map_err(|e| {
            warn!("Action notification failed: {}", e);
            Error::ApiError(e.to_string())
        })?;

        debug!("Notified backend of {} action", action.as_str());
        Ok(())
    }

    /// Exchange an identity token for a backend session token
    #[instrument(skip(self, id_token))]
    pub async fn exchange_session(&self, id_token: &str) -> Result<SessionExchangeResponse> {
        let url = self.url("/auth/session");
        debug!("Exchanging identity token for backend session");

        let request = SessionExchangeRequest {
            id_token: id_token.to_string(),
        };

        let response = self.http.post(&url).json(&request).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(Error::TokenExpired);
        }

        let response = response.error_for_status().map_err(|e| {
            error!("Session exchange failed: {}", e);
            Error::AuthenticationError(e.to_string())
        })?;

        let exchange: SessionExchangeResponse = response.json().await.map_err(|e| {
            error!("Failed to parse session exchange response: {}", e);
            Error::InvalidData(e.to_string())
        })?;

        Ok(exchange)
    }

    /// Verify admin credentials against the backend
    #[instrument(skip(self, password))]
    pub async fn verify_admin(&self, username: &str, password: &str) -> Result<AdminLoginResponse> {
        let url = self.url("/admin/login");

        let request = AdminLoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };

        let response = self.http.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            debug!("Admin login rejected: HTTP {}", status);
            return Ok(AdminLoginResponse {
                ok: false,
                token: None,
            });
        }

        let mut parsed: AdminLoginResponse = response.json().await.map_err(|e| {
            error!("Failed to parse admin login response: {}", e);
            Error::InvalidData(e.to_string())
        })?;
        parsed.ok = true;
        Ok(parsed)
    }

    /// Shared token state (for login/logout flows)
    pub fn auth(&self) -> &Arc<AuthTokens> {
        &self.auth
    }

    /// Get a reference to the cache (if one is attached)
    pub fn cache(&self) -> Option<&Arc<DefinitionsCache>> {
        self.cache.as_ref()
    }
}
