use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;
use upstep_common::{Error, Result};

/// Durable record of the highest migration version that has fully completed.
///
/// Implementations must make a successful [`set_checkpoint`] visible to later
/// [`checkpoint`] calls in the same process. If a store is shared between
/// threads it guards its own state; the runner takes no lock over it.
///
/// [`set_checkpoint`]: CheckpointStore::set_checkpoint
/// [`checkpoint`]: CheckpointStore::checkpoint
pub trait CheckpointStore: Send + Sync {
    /// Version of the last migration that completed, or `None` if no
    /// migration has ever completed.
    fn checkpoint(&self) -> Result<Option<i64>>;

    /// Persist `version` as the new checkpoint. Fails with
    /// [`Error::InvalidArgument`] when `version <= 0`.
    fn set_checkpoint(&self, version: i64) -> Result<()>;

    /// Forget the checkpoint so the next run starts from the first migration.
    /// Operator recovery only; never called by the runner.
    fn clear_checkpoint(&self) -> Result<()> {
        Err(Error::Other("clear not supported by this store".into()))
    }
}

/// Rejects non-positive checkpoint writes. Shared by every store.
pub fn ensure_positive_checkpoint(version: i64) -> Result<()> {
    if version <= 0 {
        return Err(Error::InvalidArgument(format!(
            "checkpoint version must be positive, found {version}"
        )));
    }
    Ok(())
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for &S {
    fn checkpoint(&self) -> Result<Option<i64>> {
        (**self).checkpoint()
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        (**self).set_checkpoint(version)
    }

    fn clear_checkpoint(&self) -> Result<()> {
        (**self).clear_checkpoint()
    }
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for Arc<S> {
    fn checkpoint(&self) -> Result<Option<i64>> {
        (**self).checkpoint()
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        (**self).set_checkpoint(version)
    }

    fn clear_checkpoint(&self) -> Result<()> {
        (**self).clear_checkpoint()
    }
}

impl<S: CheckpointStore + ?Sized> CheckpointStore for Box<S> {
    fn checkpoint(&self) -> Result<Option<i64>> {
        (**self).checkpoint()
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        (**self).set_checkpoint(version)
    }

    fn clear_checkpoint(&self) -> Result<()> {
        (**self).clear_checkpoint()
    }
}

/// Process-local checkpoint store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    last_version: Mutex<Option<i64>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing checkpoint, as if `version` had already run.
    pub fn with_checkpoint(version: i64) -> Self {
        Self {
            last_version: Mutex::new(Some(version)),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, Option<i64>>> {
        self.last_version
            .lock()
            .map_err(|_| Error::Other("checkpoint store lock poisoned".into()))
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn checkpoint(&self) -> Result<Option<i64>> {
        Ok(*self.state()?)
    }

    fn set_checkpoint(&self, version: i64) -> Result<()> {
        ensure_positive_checkpoint(version)?;
        *self.state()? = Some(version);
        debug!("in-memory checkpoint set to {version}");
        Ok(())
    }

    fn clear_checkpoint(&self) -> Result<()> {
        *self.state()? = None;
        Ok(())
    }
}
