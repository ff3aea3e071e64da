//! Application state management

use shake_persistence::cache::DefinitionsCache;
use shake_persistence::{Database, TokenEncryptor};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Global application state shared across commands and background tasks
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<RwLock<Option<Database>>>,
    pub encryptor: Arc<TokenEncryptor>,
    pub data_dir: PathBuf,
    /// Shared reward-definition cache for reducing API calls
    pub definitions_cache: Arc<DefinitionsCache>,
}

impl AppState {
    /// Create new application state
    pub fn new(data_dir: PathBuf, encryption_key: &[u8]) -> Result<Self, String> {
        let encryptor = TokenEncryptor::new(encryption_key).map_err(|e| e.to_string())?;

        Ok(Self {
            db: Arc::new(RwLock::new(None)),
            encryptor: Arc::new(encryptor),
            data_dir,
            definitions_cache: Arc::new(DefinitionsCache::default()),
        })
    }

    /// Initialize the database connection
    pub async fn init_db(&self) -> Result<(), String> {
        let db_path = self.data_dir.join("shake.db");
        let db = Database::connect(&db_path)
            .await
            .map_err(|e| e.to_string())?;

        let mut db_lock = self.db.write().await;
        *db_lock = Some(db);

        Ok(())
    }
}
