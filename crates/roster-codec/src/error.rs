use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Stored content is not a well-formed ledger.
    #[error("ledger decode error at line {line}, column {column}: {reason}")]
    Decode {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("ledger encode error: {0}")]
    Encode(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
