pub mod checkpoint;
pub mod migration;
pub mod runner;

pub use checkpoint::{CheckpointStore, InMemoryCheckpointStore, ensure_positive_checkpoint};
pub use migration::{FnMigration, Migration};
pub use runner::{MigrationRunner, RunReport};
