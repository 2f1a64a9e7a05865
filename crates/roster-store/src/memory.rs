//! In-memory versioned blob store for tests and embedding.
//!
//! [`InMemoryBlobStore`] keeps every blob in a `HashMap` behind a `RwLock`.
//! The conditional-write check and the write itself happen under one write
//! lock, so concurrent commits with the same expected version cannot both
//! succeed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use roster_types::{BlobPath, Version, VersionedBlob};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitRequest, VersionedBlobStore};

#[derive(Clone, Debug)]
struct StoredBlob {
    content: Bytes,
    version: Version,
    message: String,
}

/// An in-memory implementation of [`VersionedBlobStore`].
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobPath, StoredBlob>>,
    next_version: AtomicU64,
    fetch_calls: AtomicUsize,
    commit_calls: AtomicUsize,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn mint_version(&self) -> Version {
        let n = self.next_version.fetch_add(1, Ordering::Relaxed) + 1;
        Version::new(format!("mem-{n:08}"))
    }

    /// Unconditionally write `content` at `path`, bypassing the version check.
    ///
    /// Used to seed fixtures, including content that is not a valid ledger.
    pub fn put_raw(&self, path: &BlobPath, content: impl Into<Bytes>) -> StoreResult<Version> {
        let version = self.mint_version();
        let mut blobs = self.blobs.write().map_err(poisoned)?;
        blobs.insert(
            path.clone(),
            StoredBlob {
                content: content.into(),
                version: version.clone(),
                message: "seed".into(),
            },
        );
        Ok(version)
    }

    /// Current blob at `path`, without counting as a fetch call.
    pub fn snapshot(&self, path: &BlobPath) -> StoreResult<Option<VersionedBlob>> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs
            .get(path)
            .map(|b| VersionedBlob::new(path.clone(), b.content.clone(), b.version.clone())))
    }

    /// Message of the last write at `path`.
    pub fn last_message(&self, path: &BlobPath) -> StoreResult<Option<String>> {
        let blobs = self.blobs.read().map_err(poisoned)?;
        Ok(blobs.get(path).map(|b| b.message.clone()))
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::Relaxed)
    }

    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::Relaxed)
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::fatal(None, format!("lock poisoned: {e}"))
}

#[async_trait]
impl VersionedBlobStore for InMemoryBlobStore {
    async fn fetch(&self, path: &BlobPath) -> StoreResult<Option<VersionedBlob>> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        self.snapshot(path)
    }

    async fn commit(&self, request: &CommitRequest) -> StoreResult<Version> {
        self.commit_calls.fetch_add(1, Ordering::Relaxed);

        let mut blobs = self.blobs.write().map_err(poisoned)?;
        let current = blobs.get(&request.path).map(|b| &b.version);
        if current != request.expected_version.as_ref() {
            return Err(StoreError::Conflict {
                path: request.path.clone(),
            });
        }

        let version = self.mint_version();
        blobs.insert(
            request.path.clone(),
            StoredBlob {
                content: request.content.clone(),
                version: version.clone(),
                message: request.message.clone(),
            },
        );
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> BlobPath {
        BlobPath::new("data/submissions.json").unwrap()
    }

    fn request(content: &'static str, expected: Option<Version>) -> CommitRequest {
        CommitRequest {
            path: path(),
            content: Bytes::from_static(content.as_bytes()),
            expected_version: expected,
            message: "test".into(),
        }
    }

    #[tokio::test]
    async fn fetch_missing_is_none() {
        let store = InMemoryBlobStore::new();
        assert!(store.fetch(&path()).await.unwrap().is_none());
        assert_eq!(store.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn create_then_fetch() {
        let store = InMemoryBlobStore::new();
        let v1 = store.commit(&request("[]", None)).await.unwrap();

        let blob = store.fetch(&path()).await.unwrap().unwrap();
        assert_eq!(&blob.content[..], b"[]");
        assert_eq!(blob.version, v1);
    }

    #[tokio::test]
    async fn create_over_existing_conflicts() {
        let store = InMemoryBlobStore::new();
        store.commit(&request("[]", None)).await.unwrap();

        let err = store.commit(&request("[1]", None)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn update_requires_current_version() {
        let store = InMemoryBlobStore::new();
        let v1 = store.commit(&request("a", None)).await.unwrap();
        let v2 = store.commit(&request("b", Some(v1.clone()))).await.unwrap();
        assert_ne!(v1, v2);

        let err = store.commit(&request("c", Some(v1))).await.unwrap_err();
        assert!(err.is_conflict());

        let blob = store.snapshot(&path()).unwrap().unwrap();
        assert_eq!(&blob.content[..], b"b");
        assert_eq!(blob.version, v2);
        assert_eq!(store.commit_calls(), 3);
    }

    #[tokio::test]
    async fn update_of_missing_blob_conflicts() {
        let store = InMemoryBlobStore::new();
        let err = store
            .commit(&request("a", Some(Version::new("stale"))))
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(store.snapshot(&path()).unwrap().is_none());
    }

    #[tokio::test]
    async fn put_raw_seeds_without_version_check() {
        let store = InMemoryBlobStore::new();
        let v = store.put_raw(&path(), "garbage").unwrap();
        let blob = store.fetch(&path()).await.unwrap().unwrap();
        assert_eq!(blob.version, v);
        assert_eq!(store.last_message(&path()).unwrap().as_deref(), Some("seed"));
    }

    #[tokio::test]
    async fn concurrent_creates_admit_one_winner() {
        let store = std::sync::Arc::new(InMemoryBlobStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.commit(&request("x", None)).await }));
        }
        let mut wins = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }
}
