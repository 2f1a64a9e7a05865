use roster_codec::CodecError;
use roster_store::StoreError;
use roster_types::BlobPath;
use thiserror::Error;

/// Errors from append and ledger read operations.
///
/// Every variant except [`AppendError::Cancelled`] is an append failure. The
/// `Display` text carries operator diagnostics and must not be shown to
/// submitters.
#[derive(Debug, Error)]
pub enum AppendError {
    /// Existing blob content is not a valid ledger. Nothing was written; the
    /// blob needs manual repair.
    #[error("ledger at {path} is corrupt: {reason}")]
    CorruptLedger { path: BlobPath, reason: String },

    /// Every commit attempt hit a version conflict. The blob is unchanged by
    /// this operation.
    #[error("gave up on {path} after {attempts} conflicting commit attempts")]
    ConflictsExhausted { path: BlobPath, attempts: u32 },

    /// The store kept failing transiently while reading the ledger.
    #[error("store unavailable after {attempts} fetch attempts: {last}")]
    TransientExhausted { attempts: u32, last: StoreError },

    /// A non-retryable store failure.
    #[error("store error: {0}")]
    Store(StoreError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// The caller's cancellation token fired.
    #[error("append cancelled")]
    Cancelled,

    #[error("invalid retry configuration: {0}")]
    InvalidConfig(String),
}

impl AppendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

pub type AppendResult<T> = Result<T, AppendError>;
