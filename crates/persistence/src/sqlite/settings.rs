//! Key/value settings table (theme preference, ledger blobs, ephemeral records)

use shake_core::{Error, Result};
use sqlx::SqlitePool;

/// Read a settings value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))
}

/// Insert or update a settings value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await
    .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Delete a settings value
pub async fn delete_setting(pool: &SqlitePool, key: &str) -> Result<()> {
    sqlx::query("DELETE FROM settings WHERE key = ?")
        .bind(key)
        .execute(pool)
        .await
        .map_err(|e| Error::DatabaseError(e.to_string()))?;

    Ok(())
}

/// Read a value and delete it in the same call (single-consumption records)
pub async fn take_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value = get_setting(pool, key).await?;
    if value.is_some() {
        delete_setting(pool, key).await?;
    }
    Ok(value)
}

/// Saved theme preference ("light" / "dark")
pub async fn get_theme(pool: &SqlitePool) -> Result<Option<String>> {
    get_setting(pool, "theme").await
}

pub async fn set_theme(pool: &SqlitePool, theme: &str) -> Result<()> {
    set_setting(pool, "theme", theme).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let db = Database::connect_in_memory().await.unwrap();
        set_setting(db.pool(), "theme", "dark").await.unwrap();
        assert_eq!(
            get_setting(db.pool(), "theme").await.unwrap().as_deref(),
            Some("dark")
        );
    }

    #[tokio::test]
    async fn test_take_consumes_value() {
        let db = Database::connect_in_memory().await.unwrap();
        set_setting(db.pool(), "ephemeral", "x").await.unwrap();

        let taken = take_setting(db.pool(), "ephemeral").await.unwrap();
        assert_eq!(taken.as_deref(), Some("x"));

        // Second read finds nothing
        assert!(take_setting(db.pool(), "ephemeral").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let db = Database::connect_in_memory().await.unwrap();
        set_setting(db.pool(), "k", "one").await.unwrap();
        set_setting(db.pool(), "k", "two").await.unwrap();
        assert_eq!(
            get_setting(db.pool(), "k").await.unwrap().as_deref(),
            Some("two")
        );
    }
}
