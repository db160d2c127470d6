use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub log: LogConfig,
}

/// Where the migration checkpoint lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Database or JSON file path. Defaults to a file under the config dir.
    pub path: Option<PathBuf>,
    /// Key/value namespace (SQLite backend only).
    pub namespace: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: None,
            namespace: "migration_version_store".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl StoreConfig {
    /// Configured path, or the backend's default file under `config_dir`.
    /// `None` for the memory backend.
    pub fn resolved_path(&self, config_dir: &Path) -> Option<PathBuf> {
        match self.backend {
            StoreBackend::Memory => None,
            StoreBackend::Sqlite => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| config_dir.join("data").join("checkpoint.db")),
            ),
            StoreBackend::File => Some(
                self.path
                    .clone()
                    .unwrap_or_else(|| config_dir.join("data").join("checkpoint.json")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_sqlite_under_config_dir() {
        let config = AppConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.namespace, "migration_version_store");
        assert_eq!(config.log.level, "info");
        assert_eq!(
            config.store.resolved_path(Path::new("/tmp/upstep")),
            Some(PathBuf::from("/tmp/upstep/data/checkpoint.db"))
        );
    }

    #[test]
    fn explicit_path_wins_and_memory_has_none() {
        let mut store = StoreConfig {
            backend: StoreBackend::File,
            path: Some(PathBuf::from("/var/lib/app/ckpt.json")),
            ..Default::default()
        };
        assert_eq!(
            store.resolved_path(Path::new("/ignored")),
            Some(PathBuf::from("/var/lib/app/ckpt.json"))
        );

        store.backend = StoreBackend::Memory;
        assert_eq!(store.resolved_path(Path::new("/ignored")), None);
    }
}
