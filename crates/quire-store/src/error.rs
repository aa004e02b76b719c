use quire_types::{TypeError, Uid};

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested item does not exist in its bucket.
    #[error("item not found: {bucket}/{key}")]
    NotFound { bucket: &'static str, key: String },

    /// The bucket was never created in this database.
    #[error("bucket does not exist: {0}")]
    BucketMissing(&'static str),

    /// A write was attempted through a read-only transaction.
    #[error("transaction is not writable")]
    TxPrivilege,

    /// The engine refused to open a transaction.
    #[error("failed to open transaction: {0}")]
    TxOpen(#[source] redb::TransactionError),

    /// Commit or rollback failed. When the transaction was being rolled
    /// back because of an earlier error, that error is kept in `original`.
    #[error("failed to end transaction: {source}")]
    TxEnd {
        source: redb::Error,
        original: Option<Box<StoreError>>,
    },

    /// The transaction committed, but the bytes of `blob` could not be
    /// moved to their final name. Reads of that blob report it missing.
    #[error("transaction committed but blob {blob} was not published: {source}")]
    BlobPublish {
        blob: Uid,
        #[source]
        source: std::io::Error,
    },

    /// The caller cancelled the operation before it committed.
    #[error("operation cancelled")]
    Cancelled,

    /// Stored data violates an integrity rule. Indicates a prior bug.
    #[error("unexpected state: {0}")]
    UnexpectedState(String),

    /// Caller-supplied data was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Record encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the blob directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other engine failure.
    #[error("storage engine error: {0}")]
    Engine(#[from] redb::Error),
}

impl StoreError {
    /// Returns `true` for missing items and missing buckets.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BucketMissing(_))
    }

    /// Returns `true` when the failed operation was nevertheless committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::BlobPublish { .. })
    }

    /// The error that caused a failed rollback, or `self` otherwise.
    pub fn original_cause(&self) -> &StoreError {
        match self {
            Self::TxEnd {
                original: Some(original),
                ..
            } => original.original_cause(),
            other => other,
        }
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(err: redb::StorageError) -> Self {
        Self::Engine(err.into())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(err: redb::TableError) -> Self {
        Self::Engine(err.into())
    }
}

impl From<TypeError> for StoreError {
    fn from(err: TypeError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
