use reth_db::DatabaseError;
use thiserror::Error;

/// Errors that may occur while interacting with the chain store.
///
/// Every accessor returns this error. Callers are expected to branch on the variant: a missing
/// entry is a normal negative answer, whereas a corrupt record or a contradictory index points at
/// damaged storage and must not be treated as a miss.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying database call failed. The operation may be retried by the caller.
    #[error("database error: {0}")]
    Database(#[source] DatabaseError),

    /// The database environment could not be opened.
    #[error("failed to open database: {0}")]
    DatabaseInit(#[from] eyre::Report),

    /// The expected entry was not found in the database.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Bytes were present but could not be decoded into the expected record.
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// A derived index points to data that is absent or does not match.
    #[error("inconsistent index: {0}")]
    InconsistentIndex(String),

    /// A write was rejected because it conflicts with the stored chain.
    #[error("conflict error: {0}")]
    ConflictError(String),
}

impl StorageError {
    /// Returns `true` if the error is a plain miss.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::EntryNotFound(_))
    }
}

impl From<DatabaseError> for StorageError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Decode => {
                Self::CorruptRecord("failed to decode stored value".to_string())
            }
            err => Self::Database(err),
        }
    }
}
