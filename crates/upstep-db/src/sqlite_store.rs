use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};
use upstep_common::{Error, Result};
use upstep_core::{CheckpointStore, ensure_positive_checkpoint};

pub const DEFAULT_NAMESPACE: &str = "migration_version_store";

const CHECKPOINT_KEY: &str = "last_version_successfully_migrated";

/// Checkpoint store backed by a small key/value table in SQLite.
///
/// Several namespaces can share one database file; each keeps its checkpoint
/// under a single key. A missing row means no migration has completed.
pub struct SqliteCheckpointStore {
    conn: Mutex<Connection>,
    namespace: String,
}

impl SqliteCheckpointStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening checkpoint store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            namespace: DEFAULT_NAMESPACE.to_string(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Keep the checkpoint under a different namespace in the same database.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("checkpoint store lock poisoned".into()))
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_entries (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value INTEGER NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (namespace, key)
            );",
        )
        .map_err(|e| Error::Database(format!("failed to create checkpoint table: {e}")))?;
        Ok(())
    }

    /// When the checkpoint was last written, if it exists.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let conn = self.connection()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, CHECKPOINT_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to read checkpoint timestamp: {e}")))?;
        raw.as_deref().map(parse_datetime).transpose()
    }
}

impl CheckpointStore for SqliteCheckpointStore {
    fn checkpoint(&self) -> Result<Option<i64>> {
        let conn = self.connection()?;
        let version: Option<i64> = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, CHECKPOINT_KEY],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to read checkpoint: {e}")))?;
        debug!("read checkpoint {:?} from namespace {}", version, self.namespace);
        Ok(version)
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        ensure_positive_checkpoint(version)?;
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO kv_entries (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(namespace, key)
             DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![self.namespace, CHECKPOINT_KEY, version],
        )
        .map_err(|e| Error::Database(format!("failed to write checkpoint: {e}")))?;
        debug!("checkpoint {} stored in namespace {}", version, self.namespace);
        Ok(())
    }

    fn clear_checkpoint(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute(
            "DELETE FROM kv_entries WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, CHECKPOINT_KEY],
        )
        .map_err(|e| Error::Database(format!("failed to clear checkpoint: {e}")))?;
        info!("checkpoint cleared in namespace {}", self.namespace);
        Ok(())
    }
}

/// Accepts RFC 3339 or the `YYYY-MM-DD HH:MM:SS` form SQLite's
/// `datetime('now')` writes.
fn parse_datetime(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::Database(format!("invalid checkpoint timestamp {raw:?}: {e}")))
}
