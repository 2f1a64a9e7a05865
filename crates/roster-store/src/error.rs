use roster_types::BlobPath;

/// Errors from versioned blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The commit named a version that is no longer current, or tried to
    /// create a blob that already exists.
    #[error("version conflict on {path}")]
    Conflict { path: BlobPath },

    /// A failure that may succeed if the same call is repeated.
    #[error("transient store failure: {reason}")]
    Transient { reason: String },

    /// A failure that will not go away by repeating the call.
    #[error("store failure{}: {reason}", status_suffix(.status))]
    Fatal { status: Option<u16>, reason: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (status {s})")).unwrap_or_default()
}

impl StoreError {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self::Transient { reason: reason.into() }
    }

    pub fn fatal(status: Option<u16>, reason: impl Into<String>) -> Self {
        Self::Fatal {
            status,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
