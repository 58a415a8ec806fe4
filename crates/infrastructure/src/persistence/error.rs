//! Shared error mapping for sqlx persistence layer

use application::error::ApplicationError;

/// Map a sqlx error to an application-layer error
pub fn map_sqlx_error(e: sqlx::Error) -> ApplicationError {
    match e {
        sqlx::Error::PoolTimedOut => {
            ApplicationError::Storage("Timed out waiting for a database connection".to_string())
        },
        sqlx::Error::Database(db_err) => ApplicationError::Storage(db_err.to_string()),
        other => ApplicationError::Storage(other.to_string()),
    }
}
