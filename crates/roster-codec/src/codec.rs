use bytes::Bytes;
use roster_types::{Ledger, Submission};

use crate::error::{CodecError, CodecResult};

/// Codec for the stored ledger blob.
///
/// Encoding is deterministic: struct field order is fixed, arrays keep
/// ledger order, and output is indented with two spaces for human review.
pub struct LedgerCodec;

impl LedgerCodec {
    /// Decode stored blob content into ledger records.
    ///
    /// Whitespace-only content is an empty ledger. Anything that is not a
    /// JSON array of well-formed records is a [`CodecError::Decode`]; it is
    /// never reported as an empty ledger.
    pub fn decode(content: &[u8]) -> CodecResult<Ledger> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(content).map_err(|e| CodecError::Decode {
            line: e.line(),
            column: e.column(),
            reason: e.to_string(),
        })
    }

    /// Encode ledger records as pretty-printed JSON.
    pub fn encode(records: &[Submission]) -> CodecResult<Bytes> {
        serde_json::to_vec_pretty(records)
            .map(Bytes::from)
            .map_err(|e| CodecError::Encode(e.to_string()))
    }
}
