//! User session models

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Sessions stay valid for 7 days after login
pub const SESSION_DURATION_DAYS: i64 = 7;

/// An authenticated user session (identity + token)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    /// Primary identifier
    pub email: String,
    /// Opaque bearer token for the backend (absent in cookie-only sessions)
    #[serde(default)]
    pub auth_token: Option<String>,
    pub login_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(email: &str, auth_token: Option<String>) -> Self {
        Self {
            email: email.to_lowercase(),
            auth_token,
            login_at: Utc::now(),
        }
    }

    /// Time left before the session expires (zero when already expired)
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        let expires_at = self.login_at + Duration::days(SESSION_DURATION_DAYS);
        (expires_at - now).max(Duration::zero())
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.time_remaining(now) == Duration::zero()
    }

    /// Expiring within the next day
    pub fn is_expiring_soon(&self, now: DateTime<Utc>) -> bool {
        let remaining = self.time_remaining(now);
        remaining > Duration::zero() && remaining < Duration::days(1)
    }

    /// Local part of the email, shown as the display name
    pub fn display_name(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

/// Request body for `POST /auth/session` (identity token exchange)
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExchangeRequest {
    pub id_token: String,
}

/// Response from `POST /auth/session`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExchangeResponse {
    /// Backend session bearer token
    #[serde(default, alias = "authToken")]
    pub token: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Request body for `POST /admin/login`
#[derive(Debug, Clone, Serialize)]
pub struct AdminLoginRequest {
    pub username: String,
    pub password: String,
}

/// Response from `POST /admin/login`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminLoginResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_valid_within_window() {
        let session = UserSession::new("User@Example.com", None);
        let now = Utc::now();
        assert!(!session.is_expired(now));
        assert!(!session.is_expiring_soon(now));
        assert_eq!(session.email, "user@example.com");
    }

    #[test]
    fn test_session_expires_after_seven_days() {
        let mut session = UserSession::new("a@b.com", None);
        session.login_at = Utc::now() - Duration::days(8);
        assert!(session.is_expired(Utc::now()));
    }

    #[test]
    fn test_session_expiring_soon() {
        let mut session = UserSession::new("a@b.com", None);
        session.login_at = Utc::now() - Duration::days(6) - Duration::hours(12);
        let now = Utc::now();
        assert!(!session.is_expired(now));
        assert!(session.is_expiring_soon(now));
    }

    #[test]
    fn test_display_name() {
        let session = UserSession::new("trader@example.com", None);
        assert_eq!(session.display_name(), "trader");
    }
}
