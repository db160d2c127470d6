use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use upstep_config::{StoreBackend, StoreConfig};
use upstep_core::CheckpointStore;
use upstep_db::{FileCheckpointStore, SqliteCheckpointStore};

/// The checkpoint store selected by configuration.
pub enum OpenedStore {
    Sqlite(SqliteCheckpointStore),
    File(FileCheckpointStore),
}

impl OpenedStore {
    /// Open the configured durable store. The memory backend is refused: a
    /// repair made through it would vanish when the command exits.
    pub fn open(config: &StoreConfig, data_root: &Path) -> Result<Self> {
        let path = || {
            config
                .resolved_path(data_root)
                .context("no checkpoint path for the selected backend")
        };

        match config.backend {
            StoreBackend::Sqlite => {
                let path = path()?;
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("failed to create data directory {}", parent.display())
                    })?;
                }
                let store = SqliteCheckpointStore::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?
                    .with_namespace(config.namespace.clone());
                Ok(Self::Sqlite(store))
            }
            StoreBackend::File => {
                let path = path()?;
                let store = FileCheckpointStore::open(&path)
                    .with_context(|| format!("failed to open {}", path.display()))?;
                Ok(Self::File(store))
            }
            StoreBackend::Memory => bail!(
                "the memory backend cannot be inspected or repaired from the CLI; use sqlite or file"
            ),
        }
    }

    pub fn store(&self) -> &dyn CheckpointStore {
        match self {
            Self::Sqlite(store) => store,
            Self::File(store) => store,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Sqlite(store) => format!("sqlite (namespace {})", store.namespace()),
            Self::File(store) => format!("file {}", store.path().display()),
        }
    }

    /// Last write time, for backends that record one.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(match self {
            Self::Sqlite(store) => store.updated_at()?,
            Self::File(store) => store.record()?.map(|r| r.updated_at),
        })
    }
}
