use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Error type returned by a failing migration step.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("inconsistent state: {0}")]
    InconsistentState(String),

    #[error("migration {version} failed: {source}")]
    MigrationFailure {
        version: i64,
        #[source]
        source: BoxError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`]. Match on this instead of the
/// message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InconsistentState,
    MigrationFailure,
    Storage,
    Config,
    Other,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::InconsistentState(_) => ErrorKind::InconsistentState,
            Error::MigrationFailure { .. } => ErrorKind::MigrationFailure,
            Error::Database(_) | Error::Io(_) | Error::Serialization(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Config,
            Error::Other(_) => ErrorKind::Other,
        }
    }

    /// Version of the migration that failed, if this is a migration failure.
    pub fn failed_version(&self) -> Option<i64> {
        match self {
            Error::MigrationFailure { version, .. } => Some(*version),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn error_display_includes_context() {
        let e = Error::InvalidArgument("empty migration set".into());
        assert_eq!(e.to_string(), "invalid argument: empty migration set");

        let e = Error::InconsistentState("drift".into());
        assert_eq!(e.to_string(), "inconsistent state: drift");

        let e = Error::Database("locked".into());
        assert_eq!(e.to_string(), "database error: locked");

        let e = Error::Other("misc".into());
        assert_eq!(e.to_string(), "misc");
    }

    #[test]
    fn migration_failure_carries_version_and_source() {
        let e = Error::MigrationFailure {
            version: 7,
            source: "disk full".into(),
        };
        assert_eq!(e.to_string(), "migration 7 failed: disk full");
        assert_eq!(e.failed_version(), Some(7));
        assert_eq!(e.kind(), ErrorKind::MigrationFailure);

        let source = std::error::Error::source(&e).unwrap();
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn storage_errors_share_a_kind() {
        let io = Error::from(std::io::Error::other("boom"));
        assert_eq!(io.kind(), ErrorKind::Storage);
        assert_eq!(Error::Database("x".into()).kind(), ErrorKind::Storage);
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Config);
        assert_eq!(Error::InvalidArgument("x".into()).failed_version(), None);
    }
}
