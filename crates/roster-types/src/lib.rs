//! Foundation types for Roster.
//!
//! Roster appends submitted identity records to a JSON ledger that lives as a
//! single file in a remote, version-controlled content store. This crate holds
//! the types every other Roster crate agrees on.
//!
//! # Key Types
//!
//! - [`Submission`]: One immutable ledger record with a server-assigned timestamp
//! - [`SubmissionDraft`]: Unvalidated ingress input, normalized by [`SubmissionDraft::validate`]
//! - [`Timestamp`]: Whole-second UTC instant rendered as RFC 3339 (`...Z`)
//! - [`BlobPath`]: Validated path of a blob inside the remote store
//! - [`Version`]: Opaque version token used for conditional writes
//! - [`VersionedBlob`]: Blob content together with the version it was read at
//! - [`Clock`]: Injectable source of server timestamps

pub mod blob;
pub mod error;
pub mod submission;
pub mod temporal;

pub use blob::{BlobPath, Version, VersionedBlob};
pub use error::{TypeError, ValidationError};
pub use submission::{Ledger, Submission, SubmissionDraft};
pub use temporal::{Clock, FixedClock, SystemClock, Timestamp};
