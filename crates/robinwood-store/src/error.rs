use robinwood_core::StealError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate idempotency key: {0}")]
    DuplicateKey(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("corrupt row in {table}.{column}: {detail}")]
    CorruptRow {
        table: &'static str,
        column: &'static str,
        detail: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

impl From<StoreError> for StealError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => StealError::UserNotFound(what),
            other => StealError::Storage(other.to_string()),
        }
    }
}

/// True when a rusqlite error is a UNIQUE/PRIMARY KEY violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_user_not_found() {
        let e: StealError = StoreError::NotFound("u1".into()).into();
        assert_eq!(e, StealError::UserNotFound("u1".into()));
    }

    #[test]
    fn other_errors_map_to_storage() {
        let e: StealError = StoreError::Database("locked".into()).into();
        assert_eq!(e.code(), "STORAGE_ERROR");
        assert!(!e.is_client_error());
    }
}
