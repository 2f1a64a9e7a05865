use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use roster_codec::LedgerCodec;
use roster_store::{CommitRequest, StoreError, VersionedBlobStore};
use roster_types::{BlobPath, Ledger, Submission, Version};
use tokio_util::sync::CancellationToken;

use crate::backoff::{Backoff, ExponentialBackoff};
use crate::config::RetryConfig;
use crate::error::{AppendError, AppendResult};

/// Result of a successful append.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppendReceipt {
    /// Version the store assigned to the new ledger content.
    pub version: Version,
    /// Zero-based index of the appended record in the committed ledger.
    pub position: usize,
    /// Commit attempts used, including the successful one.
    pub attempts: u32,
}

/// The ledger as last read, with the version it was read at.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LedgerView {
    pub records: Ledger,
    /// `None` when the blob does not exist yet.
    pub version: Option<Version>,
}

enum Step {
    Fetch,
    Compose {
        records: Ledger,
        base: Option<Version>,
    },
    Commit {
        content: Bytes,
        base: Option<Version>,
        position: usize,
    },
}

struct Inner {
    store: Arc<dyn VersionedBlobStore>,
    backoff: Arc<dyn Backoff>,
    config: RetryConfig,
}

/// Appends submissions to a ledger blob with optimistic concurrency.
///
/// Cheap to clone; clones share the store handle but no mutable state, so
/// concurrent appends only ever coordinate through the store's version check.
#[derive(Clone)]
pub struct AppendService {
    inner: Arc<Inner>,
}

impl AppendService {
    /// Create a service with [`ExponentialBackoff`] derived from `config`.
    pub fn new(store: Arc<dyn VersionedBlobStore>, config: RetryConfig) -> AppendResult<Self> {
        config.validate()?;
        let backoff = Arc::new(ExponentialBackoff::from_config(&config));
        Ok(Self {
            inner: Arc::new(Inner {
                store,
                backoff,
                config,
            }),
        })
    }

    /// Replace the backoff strategy.
    pub fn with_backoff(self, backoff: impl Backoff + 'static) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Arc::clone(&self.inner.store),
                backoff: Arc::new(backoff),
                config: self.inner.config.clone(),
            }),
        }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.inner.config
    }

    /// Read and decode the current ledger.
    ///
    /// A missing blob is an empty ledger. Transient fetch failures are
    /// retried within the transient budget.
    pub async fn read_ledger(
        &self,
        path: &BlobPath,
        cancel: &CancellationToken,
    ) -> AppendResult<LedgerView> {
        let mut transient_retries = 0;
        self.fetch_ledger(path, cancel, &mut transient_retries).await
    }

    /// Append `record` to the ledger at `path`.
    ///
    /// Either the ledger with `record` appended is committed, or the blob is
    /// left exactly as this call found it. On a version conflict the ledger
    /// is re-read before composing again, so records committed concurrently
    /// by other writers are never dropped.
    ///
    /// Every store call and backoff sleep races `cancel`; when it fires the
    /// in-flight call is abandoned and [`AppendError::Cancelled`] returned.
    #[tracing::instrument(skip(self, path, record, cancel), fields(path = %path, attempts = tracing::field::Empty))]
    pub async fn append(
        &self,
        path: &BlobPath,
        record: Submission,
        cancel: &CancellationToken,
    ) -> AppendResult<AppendReceipt> {
        let config = &self.inner.config;
        let message = format!("chore: append submission ({})", record.timestamp());
        let mut commit_attempts: u32 = 0;
        let mut transient_retries: u32 = 0;
        let mut step = Step::Fetch;

        loop {
            step = match step {
                Step::Fetch => {
                    let view = self.fetch_ledger(path, cancel, &mut transient_retries).await?;
                    if view.version.is_none() {
                        tracing::debug!("ledger blob absent, bootstrapping");
                    }
                    Step::Compose {
                        records: view.records,
                        base: view.version,
                    }
                }

                Step::Compose { mut records, base } => {
                    records.push(record.clone());
                    let position = records.len() - 1;
                    let content = LedgerCodec::encode(&records)?;
                    Step::Commit {
                        content,
                        base,
                        position,
                    }
                }

                Step::Commit {
                    content,
                    base,
                    position,
                } => {
                    commit_attempts += 1;
                    tracing::Span::current().record("attempts", commit_attempts);
                    let request = CommitRequest {
                        path: path.clone(),
                        content,
                        expected_version: base,
                        message: message.clone(),
                    };

                    match cancellable(cancel, self.inner.store.commit(&request)).await? {
                        Ok(version) => {
                            tracing::info!(
                                version = %version.short(),
                                position,
                                attempts = commit_attempts,
                                "submission appended",
                            );
                            return Ok(AppendReceipt {
                                version,
                                position,
                                attempts: commit_attempts,
                            });
                        }
                        Err(StoreError::Conflict { .. }) if commit_attempts < config.max_attempts => {
                            let delay = self.inner.backoff.delay(commit_attempts - 1);
                            tracing::debug!(
                                attempt = commit_attempts,
                                max_attempts = config.max_attempts,
                                delay_ms = delay.as_millis() as u64,
                                "version conflict, re-reading ledger after backoff",
                            );
                            sleep(cancel, delay).await?;
                            Step::Fetch
                        }
                        Err(StoreError::Conflict { .. }) => {
                            tracing::warn!(attempts = commit_attempts, "conflict retries exhausted");
                            return Err(AppendError::ConflictsExhausted {
                                path: path.clone(),
                                attempts: commit_attempts,
                            });
                        }
                        Err(e) => {
                            tracing::error!(error = %e, attempt = commit_attempts, "commit failed");
                            return Err(AppendError::Store(e));
                        }
                    }
                }
            };
        }
    }

    /// Fetch and decode, retrying transient failures. `transient_retries` is
    /// shared across all fetches of one append.
    async fn fetch_ledger(
        &self,
        path: &BlobPath,
        cancel: &CancellationToken,
        transient_retries: &mut u32,
    ) -> AppendResult<LedgerView> {
        let max_retries = self.inner.config.max_transient_retries;
        loop {
            match cancellable(cancel, self.inner.store.fetch(path)).await? {
                Ok(None) => return Ok(LedgerView::default()),
                Ok(Some(blob)) => {
                    return match LedgerCodec::decode(&blob.content) {
                        Ok(records) => Ok(LedgerView {
                            records,
                            version: Some(blob.version),
                        }),
                        Err(e) => {
                            tracing::error!(
                                version = %blob.version,
                                error = %e,
                                "existing ledger content does not decode; refusing to overwrite",
                            );
                            Err(AppendError::CorruptLedger {
                                path: path.clone(),
                                reason: e.to_string(),
                            })
                        }
                    };
                }
                Err(e) if e.is_transient() && *transient_retries < max_retries => {
                    let delay = self.inner.backoff.delay(*transient_retries);
                    *transient_retries += 1;
                    tracing::debug!(
                        retry = *transient_retries,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient fetch failure, retrying after backoff",
                    );
                    sleep(cancel, delay).await?;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, retries = *transient_retries, "transient retries exhausted");
                    return Err(AppendError::TransientExhausted {
                        attempts: *transient_retries + 1,
                        last: e,
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "fetch failed");
                    return Err(AppendError::Store(e));
                }
            }
        }
    }
}

async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> AppendResult<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppendError::Cancelled),
        out = fut => Ok(out),
    }
}

async fn sleep(cancel: &CancellationToken, delay: Duration) -> AppendResult<()> {
    cancellable(cancel, tokio::time::sleep(delay)).await
}
