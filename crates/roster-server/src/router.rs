use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler;
use crate::state::AppState;

/// CORS policy for browser form posts: `*` allows any origin, anything else
/// must be a single exact origin.
pub fn cors_layer(allow_origin: &str) -> ServerResult<CorsLayer> {
    let origin = match allow_origin.trim() {
        "*" => AllowOrigin::any(),
        exact => {
            let value = HeaderValue::from_str(exact).map_err(|_| {
                ServerError::Config(format!("invalid CORS origin: {exact:?}"))
            })?;
            AllowOrigin::exact(value)
        }
    };
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(Duration::from_secs(600)))
}

/// Build the axum router with all endpoints.
///
/// Requests that outlive `request_timeout` (slow bodies included) get a
/// bare 408.
pub fn build_router(state: AppState, config: &ServerConfig) -> ServerResult<Router> {
    let cors = cors_layer(&config.allow_origin)?;
    Ok(Router::new()
        .route("/health", get(handler::health_handler))
        .route("/api/login", post(handler::submit_handler))
        .with_state(state)
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_accepts_wildcard_and_exact_origin() {
        assert!(cors_layer("*").is_ok());
        assert!(cors_layer("https://forms.example").is_ok());
    }

    #[test]
    fn cors_rejects_unrepresentable_origin() {
        assert!(matches!(cors_layer("bad\norigin"), Err(ServerError::Config(_))));
    }
}
