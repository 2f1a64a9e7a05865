use std::sync::Arc;
use std::time::Duration;

use roster_append::AppendService;
use roster_types::{BlobPath, Clock};

/// Shared, read-only state handed to every request.
#[derive(Clone)]
pub struct AppState {
    pub service: AppendService,
    pub clock: Arc<dyn Clock>,
    pub ledger_path: BlobPath,
    pub append_timeout: Duration,
}
