use crate::auth::password::Hasher;
use crate::auth::token::TokenIssuer;
use crate::db;
use crate::error::StorageError;
use crate::ingest::artifacts::ArtifactStore;
use crate::ingest::job::Ingestor;
use crate::notify::Notifier;
use crate::store::SqliteStore;
use std::path::PathBuf;

/// Shared by every worker. SQLite connections are not `Sync`, so each request
/// opens its own from `db_path`.
#[derive(Clone)]
pub struct AppState {
    pub db_path: PathBuf,
    pub artifacts: ArtifactStore,
    pub tokens: TokenIssuer,
    pub hasher: Hasher,
    pub batch_size: usize,
    pub max_upload_bytes: usize,
    pub notifier: Notifier,
}

impl AppState {
    pub fn open_store(&self) -> Result<SqliteStore, StorageError> {
        Ok(SqliteStore::new(db::open(&self.db_path)?))
    }

    pub fn ingestor<'a>(&'a self, store: &'a SqliteStore) -> Ingestor<'a> {
        Ingestor {
            store,
            hasher: &self.hasher,
            artifacts: &self.artifacts,
            notifier: &self.notifier,
            batch_size: self.batch_size,
        }
    }
}
