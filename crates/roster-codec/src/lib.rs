//! Ledger codec for Roster.
//!
//! Converts between a [`Ledger`](roster_types::Ledger) of submissions and
//! the bytes stored in the remote blob: a UTF-8, pretty-printed JSON array.

pub mod codec;
pub mod error;

pub use codec::LedgerCodec;
pub use error::{CodecError, CodecResult};
