use upstep_common::BoxError;

/// A single forward step that brings the environment from one version to the
/// next.
///
/// Each migration carries a positive version that is unique within the set
/// handed to a [`MigrationRunner`](crate::MigrationRunner). Steps run in
/// ascending version order, exactly once each.
pub trait Migration: Send {
    fn version(&self) -> i64;

    /// Human-readable label used in log output.
    fn name(&self) -> &str {
        "unnamed"
    }

    fn migrate(&mut self) -> Result<(), BoxError>;
}

impl<M: Migration + ?Sized> Migration for Box<M> {
    fn version(&self) -> i64 {
        (**self).version()
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn migrate(&mut self) -> Result<(), BoxError> {
        (**self).migrate()
    }
}

/// Wraps a closure as a [`Migration`].
pub struct FnMigration<F> {
    version: i64,
    name: String,
    action: F,
}

impl<F> FnMigration<F>
where
    F: FnMut() -> Result<(), BoxError> + Send,
{
    pub fn new(version: i64, action: F) -> Self {
        Self {
            version,
            name: format!("migration_{version}"),
            action,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<F> Migration for FnMigration<F>
where
    F: FnMut() -> Result<(), BoxError> + Send,
{
    fn version(&self) -> i64 {
        self.version
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn migrate(&mut self) -> Result<(), BoxError> {
        (self.action)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_migration_invokes_closure() {
        let mut calls = 0;
        {
            let mut m = FnMigration::new(3, || {
                calls += 1;
                Ok(())
            });
            m.migrate().unwrap();
            m.migrate().unwrap();
            assert_eq!(m.version(), 3);
        }
        assert_eq!(calls, 2);
    }

    #[test]
    fn fn_migration_default_and_custom_name() {
        let m = FnMigration::new(5, || Ok(()));
        assert_eq!(m.name(), "migration_5");

        let m = m.named("add_user_settings");
        assert_eq!(m.name(), "add_user_settings");
    }

    #[test]
    fn boxed_migration_delegates() {
        let mut m: Box<dyn Migration> = Box::new(FnMigration::new(9, || Err("nope".into())));
        assert_eq!(m.version(), 9);
        let err = m.migrate().unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
