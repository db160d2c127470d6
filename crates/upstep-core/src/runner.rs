use tracing::{debug, error, info, warn};
use upstep_common::{Error, Result};

use crate::checkpoint::CheckpointStore;
use crate::migration::Migration;

/// Applies pending migrations in ascending version order and advances the
/// checkpoint after each one.
///
/// The runner owns the migration set for its lifetime but never adds or
/// removes entries; it only calls [`Migration::migrate`]. The checkpoint
/// store is injected so callers decide where progress is persisted.
pub struct MigrationRunner<S> {
    migrations: Vec<Box<dyn Migration>>,
    store: S,
}

/// Outcome of a successful [`MigrationRunner::run_pending_migrations`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Versions applied by this call, in the order they ran.
    pub applied: Vec<i64>,
    /// Checkpoint after the call. `None` only if nothing has ever run.
    pub checkpoint: Option<i64>,
}

impl RunReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

impl<S: CheckpointStore> MigrationRunner<S> {
    pub fn new(migrations: Vec<Box<dyn Migration>>, store: S) -> Result<Self> {
        if migrations.is_empty() {
            return Err(Error::InvalidArgument("empty migration set".into()));
        }
        Ok(Self { migrations, store })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Bring the environment up to date.
    ///
    /// Blocks until every pending migration has run or one of them fails. A
    /// failed migration leaves the checkpoint at the last version that
    /// completed, so calling this again resumes at the failed step.
    pub fn run_pending_migrations(&mut self) -> Result<RunReport> {
        let (last, pending) = self.plan()?;
        if pending.is_empty() {
            debug!("no pending migrations (checkpoint {:?})", last);
            return Ok(RunReport {
                applied: Vec::new(),
                checkpoint: last,
            });
        }

        let mut applied = Vec::with_capacity(pending.len());
        for idx in pending {
            let migration = &mut self.migrations[idx];
            let version = migration.version();
            info!("applying migration {} ({})", version, migration.name());

            if let Err(source) = migration.migrate() {
                error!("migration {} failed: {}", version, source);
                return Err(Error::MigrationFailure { version, source });
            }

            self.store.set_checkpoint(version)?;
            info!("migration {} applied, checkpoint advanced", version);
            applied.push(version);
        }

        let checkpoint = applied.last().copied();
        Ok(RunReport {
            applied,
            checkpoint,
        })
    }

    /// Versions a run would apply right now, in execution order. Performs the
    /// same validation as a run but executes nothing and writes nothing.
    pub fn pending_versions(&self) -> Result<Vec<i64>> {
        let (_, pending) = self.plan()?;
        Ok(pending
            .into_iter()
            .map(|idx| self.migrations[idx].version())
            .collect())
    }

    /// Returns the current checkpoint and the indices of pending migrations
    /// in ascending version order.
    fn plan(&self) -> Result<(Option<i64>, Vec<usize>)> {
        let versions: Vec<i64> = self.migrations.iter().map(|m| m.version()).collect();
        let order = sorted_validated(&versions)?;

        let last = self.store.checkpoint()?;
        let pending = select_pending(order, &versions, last)?;
        debug!(
            "checkpoint {:?}, {} of {} migrations pending",
            last,
            pending.len(),
            versions.len()
        );
        Ok((last, pending))
    }
}

/// Check the whole set regardless of what is pending and return its indices
/// sorted by ascending version.
fn sorted_validated(versions: &[i64]) -> Result<Vec<usize>> {
    if let Some(bad) = versions.iter().find(|&&v| v <= 0) {
        return Err(Error::InvalidArgument(format!(
            "migration version must be positive, found {bad}"
        )));
    }

    let mut order: Vec<usize> = (0..versions.len()).collect();
    order.sort_by_key(|&idx| versions[idx]);

    if let Some(pair) = order
        .windows(2)
        .find(|pair| versions[pair[0]] == versions[pair[1]])
    {
        return Err(Error::InvalidArgument(format!(
            "duplicate migration version {}",
            versions[pair[0]]
        )));
    }

    Ok(order)
}

/// Everything strictly after `last` in `order`. `order` must be sorted and
/// free of duplicates.
fn select_pending(
    mut order: Vec<usize>,
    versions: &[i64],
    last: Option<i64>,
) -> Result<Vec<usize>> {
    let Some(last) = last else {
        return Ok(order);
    };

    match order.binary_search_by_key(&last, |&idx| versions[idx]) {
        Ok(pos) => Ok(order.split_off(pos + 1)),
        Err(_) => {
            warn!("checkpoint {} does not match any known migration", last);
            Err(Error::InconsistentState(format!(
                "last completed version {last} has no corresponding migration in the current set"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::InMemoryCheckpointStore;
    use crate::migration::FnMigration;
    use upstep_common::ErrorKind;

    fn noop(version: i64) -> Box<dyn Migration> {
        Box::new(FnMigration::new(version, || Ok(())))
    }

    #[test]
    fn sorted_validated_orders_by_version() {
        let order = sorted_validated(&[30, 10, 20]).unwrap();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn sorted_validated_reports_first_non_positive_in_supplied_order() {
        let err = sorted_validated(&[3, 0, -5]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid argument: migration version must be positive, found 0"
        );
    }

    #[test]
    fn sorted_validated_detects_non_adjacent_duplicates() {
        let err = sorted_validated(&[2, 1, 4, 2]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            err.to_string(),
            "invalid argument: duplicate migration version 2"
        );
    }

    #[test]
    fn select_pending_without_checkpoint_returns_everything() {
        let versions = [1, 2, 3];
        let pending = select_pending(vec![0, 1, 2], &versions, None).unwrap();
        assert_eq!(pending, vec![0, 1, 2]);
    }

    #[test]
    fn select_pending_skips_through_checkpoint() {
        let versions = [5, 1, 3];
        let order = sorted_validated(&versions).unwrap();
        let pending = select_pending(order, &versions, Some(3)).unwrap();
        assert_eq!(pending, vec![0]);
    }

    #[test]
    fn select_pending_at_last_version_is_empty() {
        let versions = [1, 2];
        let pending = select_pending(vec![0, 1], &versions, Some(2)).unwrap();
        assert!(pending.is_empty());
    }

    #[test]
    fn select_pending_rejects_unknown_checkpoint() {
        let versions = [1, 3];
        let err = select_pending(vec![0, 1], &versions, Some(2)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InconsistentState);
        assert_eq!(
            err.to_string(),
            "inconsistent state: last completed version 2 has no corresponding migration in the current set"
        );
    }

    #[test]
    fn pending_versions_does_not_touch_store() {
        let store = InMemoryCheckpointStore::with_checkpoint(1);
        let runner = MigrationRunner::new(vec![noop(3), noop(1), noop(2)], &store).unwrap();
        assert_eq!(runner.pending_versions().unwrap(), vec![2, 3]);
        assert_eq!(store.checkpoint().unwrap(), Some(1));
    }

    #[test]
    fn noop_run_reports_existing_checkpoint() {
        let mut runner =
            MigrationRunner::new(vec![noop(1)], InMemoryCheckpointStore::with_checkpoint(1))
                .unwrap();
        let report = runner.run_pending_migrations().unwrap();
        assert!(report.is_noop());
        assert_eq!(report.checkpoint, Some(1));
    }

    #[test]
    fn into_store_returns_injected_store() {
        let mut runner =
            MigrationRunner::new(vec![noop(1), noop(2)], InMemoryCheckpointStore::new()).unwrap();
        runner.run_pending_migrations().unwrap();
        assert_eq!(runner.store().checkpoint().unwrap(), Some(2));
        let store = runner.into_store();
        assert_eq!(store.checkpoint().unwrap(), Some(2));
    }
}
