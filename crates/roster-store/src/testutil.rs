//! Fault injection around a [`VersionedBlobStore`] for retry tests.
//!
//! [`FaultyStore`] forwards to an inner store, but first consumes scripted
//! faults: fetch failures, forced commit outcomes, and an interfering writer
//! that lands a competing commit just before the caller's commit so that the
//! caller observes a genuine version conflict.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use roster_types::{BlobPath, Version, VersionedBlob};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitRequest, VersionedBlobStore};

/// A scripted failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    Transient,
    Fatal,
    Conflict,
}

type Rewrite = Box<dyn Fn(Option<&Bytes>) -> Bytes + Send + Sync>;

struct Interference {
    remaining: usize,
    rewrite: Rewrite,
}

/// Store wrapper that injects scripted faults before forwarding.
pub struct FaultyStore<S> {
    inner: S,
    fetch_faults: Mutex<VecDeque<Option<Fault>>>,
    commit_faults: Mutex<VecDeque<Fault>>,
    interference: Mutex<Option<Interference>>,
    fetch_calls: AtomicUsize,
    commit_calls: AtomicUsize,
    committed_contents: Mutex<Vec<Bytes>>,
    expected_versions: Mutex<Vec<Option<Version>>>,
}

impl<S: VersionedBlobStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fetch_faults: Mutex::new(VecDeque::new()),
            commit_faults: Mutex::new(VecDeque::new()),
            interference: Mutex::new(None),
            fetch_calls: AtomicUsize::new(0),
            commit_calls: AtomicUsize::new(0),
            committed_contents: Mutex::new(Vec::new()),
            expected_versions: Mutex::new(Vec::new()),
        }
    }

    /// Fail the next fetches, in order, with the given faults.
    pub fn fail_fetches(self, faults: impl IntoIterator<Item = Fault>) -> Self {
        self.script_fetches(faults.into_iter().map(Some))
    }

    /// Script the next fetches one call at a time: `Some(fault)` fails that
    /// call, `None` lets it through to the inner store.
    pub fn script_fetches(self, script: impl IntoIterator<Item = Option<Fault>>) -> Self {
        lock(&self.fetch_faults).extend(script);
        self
    }

    /// Fail the next commits, in order, with the given faults. A scripted
    /// commit fault never reaches the inner store.
    pub fn fail_commits(self, faults: impl IntoIterator<Item = Fault>) -> Self {
        lock(&self.commit_faults).extend(faults);
        self
    }

    /// Before each of the next `times` commits, commit `rewrite(current)` to
    /// the inner store on behalf of a competing writer.
    pub fn interfere<F>(self, times: usize, rewrite: F) -> Self
    where
        F: Fn(Option<&Bytes>) -> Bytes + Send + Sync + 'static,
    {
        *lock(&self.interference) = Some(Interference {
            remaining: times,
            rewrite: Box::new(rewrite),
        });
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Commit attempts made by the caller, including faulted ones.
    pub fn commit_calls(&self) -> usize {
        self.commit_calls.load(Ordering::SeqCst)
    }

    /// Content of every commit attempt made by the caller, in order.
    pub fn attempted_contents(&self) -> Vec<Bytes> {
        lock(&self.committed_contents).clone()
    }

    /// Expected version of every commit attempt made by the caller, in order.
    pub fn attempted_versions(&self) -> Vec<Option<Version>> {
        lock(&self.expected_versions).clone()
    }

    async fn run_interference(&self, path: &BlobPath) -> StoreResult<()> {
        let competing = {
            let mut guard = lock(&self.interference);
            match guard.as_mut() {
                Some(i) if i.remaining > 0 => {
                    i.remaining -= 1;
                    true
                }
                _ => false,
            }
        };
        if !competing {
            return Ok(());
        }

        let current = self.inner.fetch(path).await?;
        let content = {
            let guard = lock(&self.interference);
            match guard.as_ref() {
                Some(i) => (i.rewrite)(current.as_ref().map(|b| &b.content)),
                None => return Ok(()),
            }
        };
        let request = CommitRequest {
            path: path.clone(),
            content,
            expected_version: current.map(|b| b.version),
            message: "competing writer".into(),
        };
        self.inner.commit(&request).await?;
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn injected(fault: Fault, path: &BlobPath) -> StoreError {
    match fault {
        Fault::Transient => StoreError::transient("injected transient failure"),
        Fault::Fatal => StoreError::fatal(Some(403), "injected fatal failure"),
        Fault::Conflict => StoreError::Conflict { path: path.clone() },
    }
}

#[async_trait]
impl<S: VersionedBlobStore> VersionedBlobStore for FaultyStore<S> {
    async fn fetch(&self, path: &BlobPath) -> StoreResult<Option<VersionedBlob>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let fault = lock(&self.fetch_faults).pop_front().flatten();
        if let Some(fault) = fault {
            return Err(injected(fault, path));
        }
        self.inner.fetch(path).await
    }

    async fn commit(&self, request: &CommitRequest) -> StoreResult<Version> {
        self.commit_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.committed_contents).push(request.content.clone());
        lock(&self.expected_versions).push(request.expected_version.clone());

        let fault = lock(&self.commit_faults).pop_front();
        if let Some(fault) = fault {
            return Err(injected(fault, &request.path));
        }
        self.run_interference(&request.path).await?;
        self.inner.commit(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBlobStore;

    fn path() -> BlobPath {
        BlobPath::new("l.json").unwrap()
    }

    #[tokio::test]
    async fn scripted_fetch_faults_are_consumed_in_order() {
        let store = FaultyStore::new(InMemoryBlobStore::new())
            .fail_fetches([Fault::Transient, Fault::Fatal]);
        assert!(store.fetch(&path()).await.unwrap_err().is_transient());
        assert!(matches!(store.fetch(&path()).await.unwrap_err(), StoreError::Fatal { .. }));
        assert!(store.fetch(&path()).await.unwrap().is_none());
        assert_eq!(store.fetch_calls(), 3);
        assert_eq!(store.inner().fetch_calls(), 1);
    }

    #[tokio::test]
    async fn fetch_script_passes_unfaulted_calls_through() {
        let store = FaultyStore::new(InMemoryBlobStore::new())
            .script_fetches([None, Some(Fault::Transient), None]);
        assert!(store.fetch(&path()).await.unwrap().is_none());
        assert!(store.fetch(&path()).await.unwrap_err().is_transient());
        assert!(store.fetch(&path()).await.unwrap().is_none());
        assert_eq!(store.inner().fetch_calls(), 2);
    }

    #[tokio::test]
    async fn interference_causes_real_conflict() {
        let store = FaultyStore::new(InMemoryBlobStore::new())
            .interfere(1, |_| Bytes::from_static(b"theirs"));
        let request = CommitRequest {
            path: path(),
            content: Bytes::from_static(b"ours"),
            expected_version: None,
            message: "m".into(),
        };
        assert!(store.commit(&request).await.unwrap_err().is_conflict());
        let blob = store.inner().snapshot(&path()).unwrap().unwrap();
        assert_eq!(&blob.content[..], b"theirs");

        let retry = CommitRequest {
            expected_version: Some(blob.version),
            ..request
        };
        store.commit(&retry).await.unwrap();
        assert_eq!(store.attempted_contents().len(), 2);
    }
}
