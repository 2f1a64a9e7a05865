//! HTTP ingress for Roster.
//!
//! Accepts identity submissions from a public form, validates them, stamps
//! them with the server clock, and appends them to the shared ledger through
//! [`roster_append::AppendService`].
//!
//! | route            | method | outcome                                  |
//! |------------------|--------|------------------------------------------|
//! | `/health`        | GET    | 200 `{"status":"ok"}`                    |
//! | `/api/login`     | POST   | 201 saved, 400 invalid, 500 failed, 504 timed out |

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::{AppConfig, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use server::RosterServer;
pub use state::AppState;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use roster_store::InMemoryBlobStore;
    use roster_types::{FixedClock, Timestamp};
    use tower::util::ServiceExt;

    fn app() -> axum::Router {
        let mut config = AppConfig::default();
        config.github.token = "t".into();
        config.github.repo = "octo/forms".into();
        config.ledger_path = "data/submissions.json".into();
        let clock = Arc::new(FixedClock(Timestamp::from_unix_secs(0).unwrap()));
        RosterServer::new(config, Arc::new(InMemoryBlobStore::new()), clock)
            .unwrap()
            .router()
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], br#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/login")
                    .header("origin", "https://forms.example")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(response.headers()["access-control-max-age"], "600");
    }
}
