use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use bytes::Bytes;
use roster_append::CancellationToken;
use roster_types::SubmissionDraft;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// Liveness probe. Does not touch the store.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Accept one submission and append it to the ledger.
///
/// The body is parsed here rather than through the `Json` extractor so that
/// every malformed body, including unknown fields, gets the same 400 shape.
pub async fn submit_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> ServerResult<(StatusCode, Json<Value>)> {
    let request_id = Uuid::now_v7();

    let draft: SubmissionDraft = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(%request_id, error = %e, "rejecting malformed submission");
        ServerError::BadRequest(format!("invalid json: {e}"))
    })?;
    let record = draft.validate(state.clock.now()).inspect_err(|e| {
        tracing::debug!(%request_id, error = %e, "rejecting incomplete submission");
    })?;

    let cancel = CancellationToken::new();
    let deadline = tokio::spawn({
        let cancel = cancel.clone();
        let timeout = state.append_timeout;
        async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        }
    });
    let outcome = state
        .service
        .append(&state.ledger_path, record, &cancel)
        .await;
    deadline.abort();

    match outcome {
        Ok(receipt) => {
            tracing::info!(
                %request_id,
                version = %receipt.version.short(),
                position = receipt.position,
                attempts = receipt.attempts,
                "submission saved",
            );
            Ok((
                StatusCode::CREATED,
                Json(json!({ "ok": true, "message": "Submission saved" })),
            ))
        }
        Err(e) if e.is_cancelled() => {
            tracing::warn!(
                %request_id,
                timeout_ms = state.append_timeout.as_millis() as u64,
                "append cancelled before completion",
            );
            Err(e.into())
        }
        Err(e) => {
            tracing::error!(%request_id, error = %e, "append failed");
            Err(e.into())
        }
    }
}
