use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::store::OpenedStore;

/// Print the recorded checkpoint.
pub fn status(opened: &OpenedStore) -> Result<()> {
    let checkpoint = opened
        .store()
        .checkpoint()
        .context("failed to read checkpoint")?;

    println!("store:      {}", opened.describe());
    match checkpoint {
        Some(version) => println!("checkpoint: {version}"),
        None => println!("checkpoint: no migrations applied"),
    }
    if let Some(at) = opened.updated_at()? {
        println!("updated:    {}", at.to_rfc3339());
    }
    Ok(())
}

/// Overwrite the checkpoint, e.g. after removing a migration that the
/// environment had already applied.
pub fn set(opened: &OpenedStore, version: i64) -> Result<()> {
    // An unreadable record must not block overwriting it.
    let previous = match opened.store().checkpoint() {
        Ok(previous) => previous,
        Err(e) => {
            warn!("current checkpoint is unreadable, overwriting it: {e}");
            None
        }
    };
    opened
        .store()
        .set_checkpoint(version)
        .with_context(|| format!("failed to set checkpoint to {version}"))?;
    info!("checkpoint changed from {:?} to {}", previous, version);
    println!("checkpoint set to {version}");
    Ok(())
}

/// Forget the checkpoint so every migration runs again on next start.
pub fn clear(opened: &OpenedStore) -> Result<()> {
    opened
        .store()
        .clear_checkpoint()
        .context("failed to clear checkpoint")?;
    println!("checkpoint cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use upstep_config::{StoreBackend, StoreConfig};

    #[test]
    fn set_then_clear_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let opened = OpenedStore::open(&StoreConfig::default(), dir.path()).unwrap();

        set(&opened, 8).unwrap();
        assert_eq!(opened.store().checkpoint().unwrap(), Some(8));
        status(&opened).unwrap();

        clear(&opened).unwrap();
        assert_eq!(opened.store().checkpoint().unwrap(), None);
    }

    #[test]
    fn set_overwrites_corrupt_checkpoint_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: StoreBackend::File,
            ..Default::default()
        };
        let opened = OpenedStore::open(&config, dir.path()).unwrap();
        std::fs::write(dir.path().join("data").join("checkpoint.json"), "garbage").unwrap();
        assert!(opened.store().checkpoint().is_err());

        set(&opened, 3).unwrap();
        assert_eq!(opened.store().checkpoint().unwrap(), Some(3));
    }

    #[test]
    fn set_rejects_non_positive_version() {
        let dir = tempfile::tempdir().unwrap();
        let opened = OpenedStore::open(&StoreConfig::default(), dir.path()).unwrap();

        let err = set(&opened, 0).unwrap_err();
        assert!(format!("{err:#}").contains("checkpoint version must be positive"));
        assert_eq!(opened.store().checkpoint().unwrap(), None);
    }
}
