use async_trait::async_trait;
use bytes::Bytes;
use roster_types::{BlobPath, Version, VersionedBlob};

use crate::error::StoreResult;

/// A conditional write of a whole blob.
#[derive(Clone, Debug)]
pub struct CommitRequest {
    pub path: BlobPath,
    pub content: Bytes,
    /// The version the caller last read. `None` means "create; the blob must
    /// not exist yet".
    pub expected_version: Option<Version>,
    /// Human-readable change description recorded by the store.
    pub message: String,
}

/// Remote store of versioned blobs with conditional writes.
///
/// Implementations must guarantee that of two commits to the same path with
/// the same expected version, at most one succeeds. They perform exactly one
/// remote call per method invocation: no retries, no caching.
#[async_trait]
pub trait VersionedBlobStore: Send + Sync {
    /// Read a blob and its current version.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    async fn fetch(&self, path: &BlobPath) -> StoreResult<Option<VersionedBlob>>;

    /// Replace a blob's content if its current version matches
    /// `request.expected_version`, returning the newly assigned version.
    async fn commit(&self, request: &CommitRequest) -> StoreResult<Version>;
}
