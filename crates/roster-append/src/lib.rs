//! Append protocol for Roster.
//!
//! [`AppendService`] appends one [`Submission`](roster_types::Submission) to
//! the ledger blob with an optimistic read-modify-write cycle:
//!
//! ```text
//!   Fetch ──► Compose ──► Commit ──► done
//!     ▲                     │
//!     └──── conflict ◄──────┘
//! ```
//!
//! There is no local lock. The store's conditional write is the only
//! serialization point, so any number of appends may run concurrently
//! against the same path. A conflicting commit always restarts at Fetch so
//! that records committed by other writers in the meantime are kept.
//!
//! # Modules
//!
//! - [`config`]: attempt budgets and backoff bounds in [`RetryConfig`]
//! - [`backoff`]: the injectable [`Backoff`] strategy
//! - [`service`]: the [`AppendService`] state machine
//! - [`error`]: [`AppendError`]

pub mod backoff;
pub mod config;
pub mod error;
pub mod service;

pub use backoff::{Backoff, ExponentialBackoff, NoBackoff};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::{AppendError, AppendResult};
pub use service::{AppendReceipt, AppendService, LedgerView};

pub use tokio_util::sync::CancellationToken;
