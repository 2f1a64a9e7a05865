//! Service configuration.
//!
//! [`AppConfig`] is built once at startup from an optional TOML file and the
//! process environment, validated, and then handed by value to the
//! constructors that need it. Environment variables win over the file.
//!
//! | variable            | field                  | default |
//! |---------------------|------------------------|---------|
//! | `GITHUB_TOKEN`      | `github.token`         | none    |
//! | `GITHUB_REPO`       | `github.repo`          | none    |
//! | `GITHUB_FILE_PATH`  | `ledger_path`          | none    |
//! | `GITHUB_BRANCH`     | `github.branch`        | `main`  |
//! | `PORT`              | port of `server.bind_addr` | `8080` |
//! | `CORS_ALLOW_ORIGIN` | `server.allow_origin`  | `*`     |

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use roster_append::RetryConfig;
use roster_store::GitHubConfig;
use roster_types::BlobPath;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// `*` or a single origin.
    pub allow_origin: String,
    /// Upper bound on one append, retries included.
    pub append_timeout_secs: u64,
    /// Upper bound on a whole request, body read included. Must exceed
    /// `append_timeout_secs` so that a slow append still gets its 504.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allow_origin: "*".into(),
            append_timeout_secs: 20,
            request_timeout_secs: 30,
        }
    }
}

impl ServerConfig {
    pub fn append_timeout(&self) -> Duration {
        Duration::from_secs(self.append_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Path of the ledger file inside the repository.
    pub ledger_path: String,
    pub server: ServerConfig,
    pub github: GitHubConfig,
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Parse a TOML document. Missing sections take their defaults.
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(format!("invalid config file: {e}")))
    }

    /// Read `path` if given, apply the process environment, and validate.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::Config(format!("reading {}: {e}", path.display()))
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Override fields from environment-style variables.
    ///
    /// Values are trimmed; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(token) = var("GITHUB_TOKEN") {
            self.github.token = token;
        }
        if let Some(repo) = var("GITHUB_REPO") {
            self.github.repo = repo;
        }
        if let Some(path) = var("GITHUB_FILE_PATH") {
            self.ledger_path = path;
        }
        if let Some(branch) = var("GITHUB_BRANCH") {
            self.github.branch = branch;
        }
        if let Some(origin) = var("CORS_ALLOW_ORIGIN") {
            self.server.allow_origin = origin;
        }
        if let Some(port) = var("PORT") {
            let port: u16 = port
                .parse()
                .map_err(|_| ServerError::Config(format!("PORT is not a port number: {port:?}")))?;
            self.server.bind_addr.set_port(port);
        }
        Ok(())
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.github.token.trim().is_empty() {
            return Err(ServerError::Config("GITHUB_TOKEN is required".into()));
        }
        if self.github.repo.trim().is_empty() {
            return Err(ServerError::Config("GITHUB_REPO is required (e.g. owner/repo)".into()));
        }
        let mut parts = self.github.repo.split('/');
        if !matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
        ) {
            return Err(ServerError::Config(format!(
                "GITHUB_REPO must look like owner/repo, got {:?}",
                self.github.repo
            )));
        }
        if self.ledger_path.trim().is_empty() {
            return Err(ServerError::Config(
                "GITHUB_FILE_PATH is required (e.g. data/submissions.json)".into(),
            ));
        }
        self.ledger_path()?;
        if self.github.branch.trim().is_empty() {
            return Err(ServerError::Config("branch must not be empty".into()));
        }
        if self.server.append_timeout_secs == 0 {
            return Err(ServerError::Config("append_timeout_secs must be positive".into()));
        }
        if self.server.request_timeout_secs <= self.server.append_timeout_secs {
            return Err(ServerError::Config(format!(
                "request_timeout_secs ({}) must exceed append_timeout_secs ({})",
                self.server.request_timeout_secs, self.server.append_timeout_secs
            )));
        }
        self.retry
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn ledger_path(&self) -> ServerResult<BlobPath> {
        BlobPath::new(self.ledger_path.trim()).map_err(|e| ServerError::Config(e.to_string()))
    }
}
