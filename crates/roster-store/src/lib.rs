//! Versioned blob store clients for Roster.
//!
//! A versioned blob store keeps whole files ("blobs") at string paths. Every
//! successful commit assigns the blob a new opaque [`Version`], and a commit
//! is only accepted when the caller names the version it last read
//! (optimistic concurrency). This crate hides the remote protocol behind the
//! [`VersionedBlobStore`] trait.
//!
//! # Backends
//!
//! - [`GitHubStore`]: the GitHub repository contents API
//! - [`InMemoryBlobStore`]: `HashMap`-based store for tests and embedding
//!
//! # Outcome mapping
//!
//! | remote outcome                          | result                      |
//! |-----------------------------------------|-----------------------------|
//! | fetch: resource absent                  | `Ok(None)`                  |
//! | fetch: network failure, 429, 5xx        | [`StoreError::Transient`]   |
//! | commit: version mismatch                | [`StoreError::Conflict`]    |
//! | anything else unexpected                | [`StoreError::Fatal`]       |
//!
//! Clients never retry and never cache between calls.

pub mod error;
pub mod github;
pub mod memory;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use github::{GitHubConfig, GitHubStore};
pub use memory::InMemoryBlobStore;
pub use traits::{CommitRequest, VersionedBlobStore};

pub use roster_types::{BlobPath, Version, VersionedBlob};
