use std::sync::Arc;

use roster_append::AppendService;
use roster_store::{GitHubStore, VersionedBlobStore};
use roster_types::{Clock, SystemClock};
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The Roster HTTP service.
pub struct RosterServer {
    config: AppConfig,
    state: AppState,
}

impl RosterServer {
    /// Build a server backed by the GitHub contents API.
    pub fn from_config(config: AppConfig) -> ServerResult<Self> {
        config.validate()?;
        let store = GitHubStore::new(config.github.clone())?;
        Self::new(config, Arc::new(store), Arc::new(SystemClock))
    }

    /// Build a server over any store and clock.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn VersionedBlobStore>,
        clock: Arc<dyn Clock>,
    ) -> ServerResult<Self> {
        let service = AppendService::new(store, config.retry.clone())?;
        let state = AppState {
            service,
            clock,
            ledger_path: config.ledger_path()?,
            append_timeout: config.server.append_timeout(),
        };
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> ServerResult<axum::Router> {
        build_router(self.state.clone(), &self.config.server)
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router()?;
        let addr = self.config.server.bind_addr;
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            repo = %self.config.github.repo,
            branch = %self.config.github.branch,
            ledger = %self.state.ledger_path,
            "roster server listening",
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
