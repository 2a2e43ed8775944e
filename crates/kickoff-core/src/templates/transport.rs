//! Two-tier transport to the template repository.
//!
//! File content is fetched through the authenticated GitHub contents API
//! first (required for private repositories; payloads arrive base64-encoded)
//! and falls back to the public raw host on any failure. Directory listings
//! only exist on the contents API, so their secondary tier is an anonymous
//! retry of the same endpoint.

use crate::auth::AuthStore;
use crate::error::{Error, Result};
use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Repository holding the registry file and template trees.
pub const DEFAULT_REPO: &str = "kickoff-dev/boilerplates";

/// Environment variable overriding the template repository.
pub const REPO_ENV: &str = "KICKOFF_TEMPLATE_REPO";

/// Branch the raw endpoint reads from.
pub const DEFAULT_BRANCH: &str = "main";

/// Registry file at the repository root describing all templates.
pub const REGISTRY_FILE: &str = "templates.json";

const GITHUB_API: &str = "https://api.github.com";
const GITHUB_RAW: &str = "https://raw.githubusercontent.com";

/// One entry of a remote directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Content URL; present for files.
    pub download_url: Option<String>,
    /// Listing URL; used to recurse into directories.
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    /// Symlinks, submodules and anything GitHub adds later.
    #[serde(other)]
    Other,
}

/// Contents-API file payload. Only the encoded content matters here.
#[derive(Deserialize)]
struct ContentPayload {
    content: String,
}

/// HTTP transport bound to one template repository.
#[derive(Debug, Clone)]
pub struct Transport {
    client: reqwest::Client,
    auth: AuthStore,
    repo: String,
    branch: String,
    api_base: String,
    raw_base: String,
}

impl Transport {
    /// Transport against the default (or env-overridden) repository.
    pub fn new(auth: AuthStore) -> Self {
        let repo = std::env::var(REPO_ENV).unwrap_or_else(|_| DEFAULT_REPO.to_string());
        Self::with_endpoints(auth, repo, GITHUB_API, GITHUB_RAW)
    }

    /// Transport with explicit endpoints. Tests point this at a mock server.
    pub fn with_endpoints(
        auth: AuthStore,
        repo: impl Into<String>,
        api_base: impl Into<String>,
        raw_base: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("kickoff-cli")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            auth,
            repo: repo.into(),
            branch: DEFAULT_BRANCH.to_string(),
            api_base: api_base.into(),
            raw_base: raw_base.into(),
        }
    }

    /// The repository this transport reads from.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/repos/{}/contents/{}", self.api_base, self.repo, path)
    }

    fn raw_url(&self, path: &str) -> String {
        format!("{}/{}/{}/{}", self.raw_base, self.repo, self.branch, path)
    }

    /// Fetch a single file with the two-tier strategy: contents API first,
    /// raw endpoint on any failure. Both failing surfaces both reasons.
    pub async fn fetch_file(&self, path: &str) -> Result<Vec<u8>> {
        let api_err = match self.fetch_via_api(path).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) => e,
        };

        match self.fetch_via_raw(path).await {
            Ok(bytes) => Ok(bytes),
            Err(raw_err) => Err(Error::Transport {
                path: path.to_string(),
                reason: format!("content API: {:#}; raw endpoint: {:#}", api_err, raw_err),
            }),
        }
    }

    /// Fetch and parse a JSON file with the same two-tier strategy. Parsing
    /// belongs to each tier: an API payload that decodes to invalid JSON
    /// still falls through to the raw endpoint.
    pub async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let api_err = match self.fetch_via_api(path).await.and_then(|bytes| {
            serde_json::from_slice(&bytes).context("invalid JSON")
        }) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => e,
        };

        match self.fetch_via_raw(path).await.and_then(|bytes| {
            serde_json::from_slice(&bytes).context("invalid JSON")
        }) {
            Ok(parsed) => Ok(parsed),
            Err(raw_err) => Err(Error::Transport {
                path: path.to_string(),
                reason: format!("content API: {:#}; raw endpoint: {:#}", api_err, raw_err),
            }),
        }
    }

    /// List a directory by its repository-relative path.
    pub async fn list_dir(&self, path: &str) -> Result<Vec<TreeEntry>> {
        self.list_at(&self.api_url(path), path).await
    }

    /// List a directory by the listing URL carried in a [`TreeEntry`].
    pub async fn list_url(&self, url: &str) -> Result<Vec<TreeEntry>> {
        self.list_at(url, url).await
    }

    /// Download raw file bytes from a content URL.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .headers(self.auth.headers())
            .send()
            .await
            .map_err(|e| Error::Transport {
                path: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                path: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Transport {
                path: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        Ok(response.bytes().await.map_err(|e| Error::Transport {
            path: url.to_string(),
            reason: e.to_string(),
        })?.to_vec())
    }

    async fn fetch_via_api(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let url = self.api_url(path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth.headers())
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {}", response.status(), url);
        }

        let payload: ContentPayload = response
            .json()
            .await
            .context("no content in API response")?;

        // GitHub wraps the base64 body at 60 columns.
        let compact: String = payload.content.split_whitespace().collect();
        BASE64
            .decode(compact.as_bytes())
            .context("invalid base64 content")
    }

    async fn fetch_via_raw(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        let url = self.raw_url(path);
        let response = self
            .client
            .get(&url)
            .headers(self.auth.headers())
            .send()
            .await
            .with_context(|| format!("request to {} failed", url))?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP {} from {}", response.status(), url);
        }

        Ok(response.bytes().await?.to_vec())
    }

    async fn list_at(&self, url: &str, label: &str) -> Result<Vec<TreeEntry>> {
        let first = match self.try_list(url, self.auth.headers()).await {
            Ok(entries) => return Ok(entries),
            Err(e) => e,
        };

        // A bad or expired token still allows listing public repositories.
        if self.auth.credentials().has_token() {
            let anonymous = crate::auth::headers_for(&crate::auth::Credentials::default());
            if let Ok(entries) = self.try_list(url, anonymous).await {
                return Ok(entries);
            }
        }

        Err(match first {
            Error::NotFound { .. } => Error::NotFound {
                path: label.to_string(),
            },
            other => other,
        })
    }

    async fn try_list(&self, url: &str, headers: HeaderMap) -> Result<Vec<TreeEntry>> {
        let response = self
            .client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| Error::Transport {
                path: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                path: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(Error::Transport {
                path: url.to_string(),
                reason: format!("HTTP {}", status),
            });
        }

        response.json().await.map_err(|e| Error::Transport {
            path: url.to_string(),
            reason: format!("invalid listing: {}", e),
        })
    }
}
