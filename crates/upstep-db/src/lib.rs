pub mod file_store;
pub mod sqlite_store;

use std::path::Path;

use upstep_common::Result;
use upstep_core::{Migration, MigrationRunner};

pub use file_store::FileCheckpointStore;
pub use sqlite_store::{DEFAULT_NAMESPACE, SqliteCheckpointStore};

/// Build a runner backed by an SQLite checkpoint store at `db_path`, using the
/// default namespace.
pub fn sqlite_runner(
    db_path: &Path,
    migrations: Vec<Box<dyn Migration>>,
) -> Result<MigrationRunner<SqliteCheckpointStore>> {
    let store = SqliteCheckpointStore::open(db_path)?;
    MigrationRunner::new(migrations, store)
}
