//! GitHub repository contents API backend.
//!
//! A blob is one file on one branch. Its version is the file's git blob SHA,
//! which the contents API requires on every update of an existing file and
//! rejects when stale.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use roster_types::{BlobPath, Version, VersionedBlob};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitRequest, VersionedBlobStore};

const API_VERSION: &str = "2022-11-28";

/// Connection settings for [`GitHubStore`].
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// API root, e.g. `https://api.github.com`.
    pub api_base: String,
    /// `owner/repo`.
    pub repo: String,
    pub branch: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub committer_name: String,
    pub committer_email: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".into(),
            repo: String::new(),
            branch: "main".into(),
            token: String::new(),
            committer_name: "Roster Bot".into(),
            committer_email: "noreply@example.com".into(),
            user_agent: concat!("roster/", env!("CARGO_PKG_VERSION")).into(),
            request_timeout_secs: 15,
        }
    }
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl fmt::Debug for GitHubConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitHubConfig")
            .field("api_base", &self.api_base)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("token", &if self.token.is_empty() { "<unset>" } else { "<redacted>" })
            .field("committer_name", &self.committer_name)
            .field("committer_email", &self.committer_email)
            .field("user_agent", &self.user_agent)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// [`VersionedBlobStore`] over the GitHub contents API.
pub struct GitHubStore {
    client: Client,
    config: GitHubConfig,
}

impl GitHubStore {
    pub fn new(config: GitHubConfig) -> StoreResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(Duration::from_secs(5))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| StoreError::fatal(None, format!("building http client: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn contents_url(&self, path: &BlobPath) -> StoreResult<Url> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|e| StoreError::fatal(None, format!("invalid api base: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StoreError::fatal(None, "api base cannot carry a path"))?;
            segments
                .pop_if_empty()
                .push("repos")
                .extend(self.config.repo.split('/'))
                .push("contents")
                .extend(path.as_str().split('/'));
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token))
    }
}

#[async_trait]
impl VersionedBlobStore for GitHubStore {
    async fn fetch(&self, path: &BlobPath) -> StoreResult<Option<VersionedBlob>> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);

        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(%path, "blob not found");
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_fetch_status(status, &body));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| StoreError::transient(format!("reading contents response: {e}")))?;
        let envelope = ContentEnvelope::parse(&body)?;
        let content = envelope.decode_content()?;

        tracing::debug!(%path, sha = %envelope.sha, bytes = content.len(), "fetched blob");
        Ok(Some(VersionedBlob::new(
            path.clone(),
            content,
            Version::new(envelope.sha),
        )))
    }

    async fn commit(&self, request: &CommitRequest) -> StoreResult<Version> {
        let url = self.contents_url(&request.path)?;
        let body = UpdateRequest {
            message: &request.message,
            content: STANDARD.encode(&request.content),
            branch: &self.config.branch,
            sha: request.expected_version.as_ref().map(Version::as_str),
            committer: Committer {
                name: &self.config.committer_name,
                email: &self.config.committer_email,
            },
        };

        // A commit whose response is lost may still have landed, so transport
        // failures here are never reported as transient.
        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::fatal(None, format!("commit request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_commit_status(
                status,
                &text,
                &request.path,
                request.expected_version.is_some(),
            ));
        }

        let raw = response
            .bytes()
            .await
            .map_err(|e| StoreError::fatal(Some(status.as_u16()), format!("reading commit response: {e}")))?;
        let parsed: UpdateResponse = serde_json::from_slice(&raw).map_err(|e| {
            StoreError::fatal(
                Some(status.as_u16()),
                format!("unexpected commit response: {e}: {}", lossy_excerpt(&raw)),
            )
        })?;

        tracing::debug!(path = %request.path, sha = %parsed.content.sha, "committed blob");
        Ok(Version::new(parsed.content.sha))
    }
}

/// Body of a successful contents `GET`.
#[derive(Debug, Deserialize)]
struct ContentEnvelope {
    #[serde(default)]
    content: String,
    encoding: String,
    sha: String,
}

impl ContentEnvelope {
    fn parse(body: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(body).map_err(|e| {
            StoreError::fatal(
                Some(200),
                format!("unexpected contents envelope: {e}: {}", lossy_excerpt(body)),
            )
        })
    }

    fn decode_content(&self) -> StoreResult<Bytes> {
        if self.encoding != "base64" {
            return Err(StoreError::fatal(
                Some(200),
                format!("unexpected content encoding: {:?}", self.encoding),
            ));
        }
        let compact: String = self.content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(compact)
            .map(Bytes::from)
            .map_err(|e| StoreError::fatal(Some(200), format!("invalid base64 content: {e}")))
    }
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    committer: Committer<'a>,
}

#[derive(Serialize)]
struct Committer<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct UpdateResponse {
    content: CommittedContent,
}

#[derive(Deserialize)]
struct CommittedContent {
    sha: String,
}

fn classify_send_error(e: reqwest::Error) -> StoreError {
    if e.is_builder() {
        StoreError::fatal(None, format!("invalid request: {e}"))
    } else {
        StoreError::transient(format!("fetch request failed: {e}"))
    }
}

fn classify_fetch_status(status: StatusCode, body: &str) -> StoreError {
    let rate_limited = status == StatusCode::FORBIDDEN && body.to_ascii_lowercase().contains("rate limit");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || rate_limited {
        StoreError::transient(format!("fetch returned {status}: {}", excerpt(body)))
    } else {
        StoreError::fatal(Some(status.as_u16()), format!("fetch returned {status}: {}", excerpt(body)))
    }
}

fn classify_commit_status(
    status: StatusCode,
    body: &str,
    path: &BlobPath,
    had_expected_version: bool,
) -> StoreError {
    match status {
        StatusCode::CONFLICT => StoreError::Conflict { path: path.clone() },
        // Creating without a sha is rejected with 422 once the file exists.
        // Other 422s (missing branch, invalid content) are not version races.
        StatusCode::UNPROCESSABLE_ENTITY if !had_expected_version && sha_not_supplied(body) => {
            StoreError::Conflict { path: path.clone() }
        }
        _ => StoreError::fatal(
            Some(status.as_u16()),
            format!("commit returned {status}: {}", excerpt(body)),
        ),
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Whether a 422 body is GitHub's `"sha" wasn't supplied` rejection.
fn sha_not_supplied(body: &str) -> bool {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.message)
        .unwrap_or_else(|_| body.to_string());
    message.contains("\"sha\" wasn't supplied")
}

fn excerpt(body: &str) -> &str {
    let end = body.char_indices().nth(512).map_or(body.len(), |(i, _)| i);
    &body[..end]
}

fn lossy_excerpt(body: &[u8]) -> String {
    excerpt(&String::from_utf8_lossy(body)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> BlobPath {
        BlobPath::new("data/submissions.json").unwrap()
    }

    fn store(api_base: &str) -> GitHubStore {
        GitHubStore::new(GitHubConfig {
            api_base: api_base.into(),
            repo: "octo/quiz".into(),
            token: "ghp_secret".into(),
            ..GitHubConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn contents_url_is_percent_encoded() {
        let s = store("https://api.github.com");
        let url = s.contents_url(&BlobPath::new("data/my file.json").unwrap()).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/octo/quiz/contents/data/my%20file.json");
    }

    #[test]
    fn contents_url_keeps_api_prefix() {
        let s = store("http://127.0.0.1:9000/api/v3/");
        let url = s.contents_url(&path()).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/v3/repos/octo/quiz/contents/data/submissions.json");
    }

    #[test]
    fn debug_redacts_token() {
        let s = store("https://api.github.com");
        let debug = format!("{:?}", s.config());
        assert!(!debug.contains("ghp_secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn envelope_decodes_wrapped_base64() {
        let body = br#"{"content":"W3sibmFtZSI6\nIkFkYSJ9XQ==\n","encoding":"base64","sha":"abc"}"#;
        let env = ContentEnvelope::parse(body).unwrap();
        assert_eq!(&env.decode_content().unwrap()[..], br#"[{"name":"Ada"}]"#);
        assert_eq!(env.sha, "abc");
    }

    #[test]
    fn envelope_rejects_other_encodings() {
        let body = br#"{"content":"","encoding":"none","sha":"abc"}"#;
        let err = ContentEnvelope::parse(body).unwrap().decode_content().unwrap_err();
        assert!(matches!(err, StoreError::Fatal { .. }));
    }

    #[test]
    fn unparseable_envelope_is_fatal_with_diagnostic() {
        let err = ContentEnvelope::parse(b"<html>maintenance</html>").unwrap_err();
        match err {
            StoreError::Fatal { reason, .. } => assert!(reason.contains("maintenance")),
            other => panic!("unexpected: {other}"),
        }
        // A directory listing is an array, not a file envelope.
        assert!(ContentEnvelope::parse(b"[]").is_err());
    }

    #[test]
    fn fetch_status_classification() {
        assert!(classify_fetch_status(StatusCode::BAD_GATEWAY, "").is_transient());
        assert!(classify_fetch_status(StatusCode::TOO_MANY_REQUESTS, "").is_transient());
        assert!(classify_fetch_status(StatusCode::FORBIDDEN, "API rate limit exceeded").is_transient());
        assert!(!classify_fetch_status(StatusCode::FORBIDDEN, "Resource not accessible").is_transient());
        assert!(matches!(
            classify_fetch_status(StatusCode::UNAUTHORIZED, "Bad credentials"),
            StoreError::Fatal { status: Some(401), .. }
        ));
    }

    #[test]
    fn commit_status_classification() {
        assert!(classify_commit_status(StatusCode::CONFLICT, "", &path(), true).is_conflict());
        let sha_missing = r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#;
        assert!(classify_commit_status(StatusCode::UNPROCESSABLE_ENTITY, sha_missing, &path(), false).is_conflict());
        assert!(matches!(
            classify_commit_status(StatusCode::UNPROCESSABLE_ENTITY, sha_missing, &path(), true),
            StoreError::Fatal { status: Some(422), .. }
        ));
        assert!(matches!(
            classify_commit_status(StatusCode::BAD_GATEWAY, "", &path(), true),
            StoreError::Fatal { status: Some(502), .. }
        ));
    }

    #[test]
    fn unrelated_422_on_create_is_fatal() {
        for body in [
            r#"{"message":"Branch main not found"}"#,
            r#"{"message":"Invalid request.\n\nFor 'properties/content', nil is not a string."}"#,
            "Unprocessable Entity",
            "",
        ] {
            let err = classify_commit_status(StatusCode::UNPROCESSABLE_ENTITY, body, &path(), false);
            assert!(!err.is_conflict(), "{body}");
            assert!(matches!(err, StoreError::Fatal { status: Some(422), .. }), "{body}");
        }
    }

    #[test]
    fn sha_not_supplied_reads_json_message_or_raw_text() {
        assert!(sha_not_supplied(r#"{"message":"Invalid request.\n\n\"sha\" wasn't supplied."}"#));
        assert!(sha_not_supplied(r#"Invalid request. "sha" wasn't supplied."#));
        assert!(!sha_not_supplied(r#"{"message":"Branch main not found"}"#));
    }

    #[test]
    fn update_request_omits_sha_on_create() {
        let body = UpdateRequest {
            message: "m",
            content: "W10=".into(),
            branch: "main",
            sha: None,
            committer: Committer { name: "n", email: "e" },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("sha").is_none());
        assert_eq!(json["branch"], "main");
    }
}
