use async_trait::async_trait;
use libsql::{Builder, Connection};
use log::info;

use crate::core::storage::{
    KeyValueStore, StorageError, STORE_DESCRIPTION, STORE_NAME, STORE_VERSION,
};

// ═══════════════════════════════════════════════════════════════
// Database — libsql-backed key-value engine.  One table, many stores.
// ═══════════════════════════════════════════════════════════════

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) a local SQLite file.
    pub async fn local(path: &str) -> Result<Self, StorageError> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        let conn = db
            .connect()
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let storage = Self { conn };
        storage.run_migrations().await?;
        info!("Opened {STORE_NAME} v{STORE_VERSION} at {path}");
        Ok(storage)
    }

    async fn run_migrations(&self) -> Result<(), StorageError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS media_store (
                    store TEXT NOT NULL,
                    key   TEXT NOT NULL,
                    value TEXT NOT NULL,
                    PRIMARY KEY (store, key)
                )",
                (),
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS store_meta (
                    name        TEXT PRIMARY KEY,
                    version     INTEGER NOT NULL,
                    description TEXT NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO store_meta (name, version, description)
                 VALUES (?1, ?2, ?3)",
                libsql::params![
                    STORE_NAME.to_string(),
                    STORE_VERSION as i64,
                    STORE_DESCRIPTION.to_string()
                ],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    /// Version tag recorded when the file was first created.
    pub async fn store_version(&self) -> Result<u32, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT version FROM store_meta WHERE name = ?1",
                libsql::params![STORE_NAME.to_string()],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            Some(row) => {
                let v = row
                    .get::<i64>(0)
                    .map_err(|e| StorageError::Database(e.to_string()))?;
                u32::try_from(v)
                    .map_err(|_| StorageError::Corruption(format!("Invalid store version: {v}")))
            }
            None => Err(StorageError::Corruption("Missing store metadata".into())),
        }
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get_item(&self, store: &str, key: &str) -> Result<Option<String>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM media_store WHERE store = ?1 AND key = ?2",
                libsql::params![store.to_string(), key.to_string()],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        match rows
            .next()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            Some(row) => Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| StorageError::Database(e.to_string()))?,
            )),
            None => Ok(None),
        }
    }

    async fn set_item(&self, store: &str, key: &str, value: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT OR REPLACE INTO media_store (store, key, value) VALUES (?1, ?2, ?3)",
                libsql::params![store.to_string(), key.to_string(), value.to_string()],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    async fn remove_item(&self, store: &str, key: &str) -> Result<(), StorageError> {
        self.conn
            .execute(
                "DELETE FROM media_store WHERE store = ?1 AND key = ?2",
                libsql::params![store.to_string(), key.to_string()],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;
        Ok(())
    }

    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        let mut rows = self
            .conn
            .query(
                "SELECT key FROM media_store WHERE store = ?1",
                libsql::params![store.to_string()],
            )
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StorageError::Database(e.to_string()))?
        {
            keys.push(
                row.get::<String>(0)
                    .map_err(|e| StorageError::Database(e.to_string()))?,
            );
        }
        Ok(keys)
    }
}
