//! Session persistence (single active session, token encrypted at rest)

use crate::encryption::EncryptedToken;
use chrono::{DateTime, Utc};
use shake_core::{Error, Result};
use sqlx::SqlitePool;

/// Database row for a stored session
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    email: String,
    token_encrypted: Option<Vec<u8>>,
    iv: Option<Vec<u8>>,
    login_at: DateTime<Utc>,
}

/// A stored session with the token still encrypted
#[derive(Debug)]
pub struct StoredSession {
    pub email: String,
    pub encrypted_token: Option<EncryptedToken>,
    pub login_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for StoredSession {
    type Error = Error;

    fn try_from(row: SessionRow) -> Result<Self> {
        let encrypted_token = match (row.token_encrypted, row.iv) {
            (Some(ciphertext), Some(iv_vec)) => {
                if iv_vec.len() != 12 {
                    return Err(Error::DatabaseError("Invalid IV length".to_string()));
                }
                let mut iv = [0u8; 12];
                iv.copy_from_slice(&iv_vec);
                Some(EncryptedToken { ciphertext, iv })
            }
            _ => None,
        };

        Ok(StoredSession {
            email: row.email,
            encrypted_token,
            login_at: row.login_at,
        })
    }
}

/// Persist the session, replacing any previous one (one session per client)
pub async fn save_session(
    pool: &SqlitePool,
    email: &str,
    encrypted_token: Option<&EncryptedToken>,
    login_at: DateTime<Utc>,
) -> Result<()> {
    // Single-session model: a new login replaces the old identity
    sqlx::query("DELETE FROM sessions")
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO sessions (email, token_encrypted, iv, login_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(email)
    .bind(encrypted_token.map(|t| t.ciphertext.clone()))
    .bind(encrypted_token.map(|t| t.iv.to_vec()))
    .bind(login_at)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Load the stored session, if any
pub async fn get_session(pool: &SqlitePool) -> Result<Option<StoredSession>> {
    let row: Option<SessionRow> = sqlx::query_as(
        r#"
        SELECT email, token_encrypted, iv, login_at
        FROM sessions
        ORDER BY login_at DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    row.map(StoredSession::try_from).transpose()
}

/// Replace the stored token for the current session
pub async fn update_session_token(
    pool: &SqlitePool,
    email: &str,
    encrypted_token: Option<&EncryptedToken>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE sessions
        SET token_encrypted = ?, iv = ?
        WHERE email = ?
        "#,
    )
    .bind(encrypted_token.map(|t| t.ciphertext.clone()))
    .bind(encrypted_token.map(|t| t.iv.to_vec()))
    .bind(email)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Delete the stored session (logout)
pub async fn clear_session(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM sessions")
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encryption::TokenEncryptor;
    use crate::Database;

    #[tokio::test]
    async fn test_save_and_load_session() {
        let db = Database::connect_in_memory().await.unwrap();
        let encryptor = TokenEncryptor::from_password("test_pw").unwrap();
        let encrypted = encryptor.encrypt("bearer-token-value").unwrap();

        save_session(db.pool(), "user@example.com", Some(&encrypted), Utc::now())
            .await
            .unwrap();

        let stored = get_session(db.pool()).await.unwrap().unwrap();
        assert_eq!(stored.email, "user@example.com");
        let token = encryptor.decrypt(&stored.encrypted_token.unwrap()).unwrap();
        assert_eq!(token, "bearer-token-value");
    }

    #[tokio::test]
    async fn test_new_login_replaces_session() {
        let db = Database::connect_in_memory().await.unwrap();
        save_session(db.pool(), "first@example.com", None, Utc::now())
            .await
            .unwrap();
        save_session(db.pool(), "second@example.com", None, Utc::now())
            .await
            .unwrap();

        let stored = get_session(db.pool()).await.unwrap().unwrap();
        assert_eq!(stored.email, "second@example.com");
    }

    #[tokio::test]
    async fn test_clear_session() {
        let db = Database::connect_in_memory().await.unwrap();
        save_session(db.pool(), "user@example.com", None, Utc::now())
            .await
            .unwrap();
        clear_session(db.pool()).await.unwrap();
        assert!(get_session(db.pool()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tokenless_session() {
        let db = Database::connect_in_memory().await.unwrap();
        save_session(db.pool(), "cookie@example.com", None, Utc::now())
            .await
            .unwrap();
        let stored = get_session(db.pool()).await.unwrap().unwrap();
        assert!(stored.encrypted_token.is_none());
    }
}
