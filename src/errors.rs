use std::sync::Arc;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{context}: {source}")]
    Connection {
        context: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// A failed database initialization, shared by every caller that was
    /// waiting on the same attempt.
    #[error("database initialization failed: {0}")]
    Initialization(#[source] Arc<Error>),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[source] sqlx::Error),

    #[error("password hashing failed: {0}")]
    Password(String),
}

impl Error {
    pub fn connection(context: &'static str) -> impl FnOnce(sqlx::Error) -> Self {
        move |source| Self::Connection { context, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolation(_))
    }

    pub fn is_connection(&self) -> bool {
        match self {
            Self::Connection { .. } => true,
            Self::Initialization(inner) => inner.is_connection(),
            _ => false,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::RowNotFound => Self::NotFound("row"),
            sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
                Self::ConstraintViolation(db_error.message().to_owned())
            }
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let error = Error::from(sqlx::Error::RowNotFound);
        assert!(error.is_not_found());
    }

    #[test]
    fn other_sqlx_errors_are_storage_errors() {
        let error = Error::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(error, Error::Storage(sqlx::Error::PoolTimedOut)));
        assert!(!error.is_constraint_violation());
    }

    #[test]
    fn connection_errors_keep_their_context() {
        let error = Error::connection("failed to ping database")(sqlx::Error::PoolClosed);
        let message = error.to_string();
        assert!(message.starts_with("failed to ping database: "), "{message}");
    }

    #[test]
    fn initialization_errors_expose_the_connection_failure() {
        let inner = Error::connection("database ping failed")(sqlx::Error::PoolTimedOut);
        let error = Error::Initialization(Arc::new(inner));
        assert!(error.is_connection());
        assert!(error
            .to_string()
            .starts_with("database initialization failed: database ping failed"));
        assert!(!Error::NotFound("admin").is_connection());
    }
}
