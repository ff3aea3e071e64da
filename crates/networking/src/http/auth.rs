//! Shared auth token state

use tokio::sync::{watch, RwLock};

/// Token state shared between the client, the synchronizer, and the app.
///
/// The bearer token is observable through a watch channel so a polling
/// loop suspended on `unauthorized` can resume as soon as the token
/// changes. The identity token (used for refresh exchange) is internal.
pub struct AuthTokens {
    bearer_tx: watch::Sender<Option<String>>,
    id_token: RwLock<Option<String>>,
}

impl AuthTokens {
    pub fn new(bearer: Option<String>, id_token: Option<String>) -> Self {
        let (bearer_tx, _) = watch::channel(bearer);
        Self {
            bearer_tx,
            id_token: RwLock::new(id_token),
        }
    }

    /// Current bearer token, if any
    pub fn bearer(&self) -> Option<String> {
        self.bearer_tx.borrow().clone()
    }

    /// Replace the bearer token and notify watchers
    pub fn set_bearer(&self, token: Option<String>) {
        let _ = self.bearer_tx.send(token);
    }

    /// Observe bearer-token changes (used to resume suspended polling)
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.bearer_tx.subscribe()
    }

    pub async fn id_token(&self) -> Option<String> {
        self.id_token.read().await.clone()
    }

    pub async fn set_id_token(&self, token: Option<String>) {
        *self.id_token.write().await = token;
    }

    /// Drop all tokens (logout)
    pub async fn clear(&self) {
        self.set_bearer(None);
        self.set_id_token(None).await;
    }
}

impl Default for AuthTokens {
    fn default() -> Self {
        Self::new(None, None)
    }
}
