use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("invalid blob path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Rejections of user-supplied submission input.
///
/// The `Display` text is safe to show to the submitter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("name and phone are required: name is empty")]
    MissingName,

    #[error("name and phone are required: phone is empty")]
    MissingPhone,
}
