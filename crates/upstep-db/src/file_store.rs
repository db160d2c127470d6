use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use upstep_common::{Error, Result};
use upstep_core::{CheckpointStore, ensure_positive_checkpoint};

/// On-disk layout of the checkpoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub last_version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Checkpoint store that keeps a single JSON document on disk.
///
/// Writes go to a sibling temp file that is then renamed over the target, so
/// a crash mid-write leaves the previous checkpoint intact.
pub struct FileCheckpointStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCheckpointStore {
    pub fn open(path: &Path) -> Result<Self> {
        info!("using checkpoint file {}", path.display());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| Error::Other("checkpoint file lock poisoned".into()))
    }

    /// Full record including the write timestamp.
    pub fn record(&self) -> Result<Option<CheckpointRecord>> {
        let _guard = self.guard()?;
        self.read_record()
    }

    fn read_record(&self) -> Result<Option<CheckpointRecord>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: CheckpointRecord = serde_json::from_str(&contents)?;
        Ok(Some(record))
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn checkpoint(&self) -> Result<Option<i64>> {
        let _guard = self.guard()?;
        Ok(self.read_record()?.map(|r| r.last_version))
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        ensure_positive_checkpoint(version)?;
        let _guard = self.guard()?;

        let record = CheckpointRecord {
            last_version: version,
            updated_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&record)?;
        let tmp = self.temp_path();
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&tmp, &self.path)?;
        debug!("checkpoint {} written to {}", version, self.path.display());
        Ok(())
    }

    fn clear_checkpoint(&self) -> Result<()> {
        let _guard = self.guard()?;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("checkpoint file {} removed", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
