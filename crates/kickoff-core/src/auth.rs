//! GitHub credential resolution.
//!
//! Tokens resolve in a fixed order: environment variables first, then the
//! credential file in the user's home directory, then anonymous. Absence of a
//! credential is never an error - requests simply go out unauthenticated.

use crate::error::Result;
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Environment variables checked for a token, in precedence order.
pub const TOKEN_ENV_VARS: &[&str] = &["GITHUB_TOKEN", "GH_TOKEN"];

/// File name of the credential file under the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".kickoff-config.json";

const ACCEPT_VALUE: &str = "application/vnd.github.v3+json";
const USER_AGENT_VALUE: &str = "kickoff-cli";

/// A stored GitHub credential. The username is informational only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Credentials {
    pub fn has_token(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// On-disk shape of the credential file: `{ "github": { token, username } }`.
/// Other tools may keep their own top-level keys in the same file; those are
/// carried through every save untouched.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    github: Credentials,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Resolves credentials and builds the request header set.
#[derive(Debug, Clone)]
pub struct AuthStore {
    config_path: PathBuf,
}

impl AuthStore {
    /// Store backed by `~/.kickoff-config.json`.
    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            config_path: home.join(CONFIG_FILE_NAME),
        }
    }

    /// Store backed by an explicit file path.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Token from the environment, if any of the accepted variables is set.
    pub fn env_token() -> Option<String> {
        TOKEN_ENV_VARS
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .filter(|t| !t.is_empty())
    }

    /// Resolve credentials: environment first, then the credential file,
    /// then anonymous. Never fails.
    pub fn credentials(&self) -> Credentials {
        if let Some(token) = Self::env_token() {
            return Credentials {
                token: Some(token),
                username: None,
            };
        }

        let file_creds = self.file_credentials();
        if file_creds.has_token() {
            return file_creds;
        }

        Credentials::default()
    }

    /// Credentials from the file only, ignoring the environment. Missing or
    /// unparseable files degrade to empty credentials.
    pub fn file_credentials(&self) -> Credentials {
        self.load_file().github
    }

    /// Header set for registry requests. Always carries `Accept` and
    /// `User-Agent`; adds `Authorization` only when a token resolved.
    pub fn headers(&self) -> HeaderMap {
        headers_for(&self.credentials())
    }

    /// Persist credentials, replacing the `github` object and leaving any
    /// other keys in the file as they were.
    pub fn save(&self, credentials: &Credentials) -> Result<()> {
        let mut config = self.load_file();
        config.github = credentials.clone();
        let json = serde_json::to_string_pretty(&config)
            .context("Failed to serialize credential file")?;
        fs::write(&self.config_path, json)?;
        Ok(())
    }

    /// Clear stored credentials by writing an empty credential set.
    pub fn clear(&self) -> Result<()> {
        self.save(&Credentials::default())
    }

    /// Path of the backing credential file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }

    fn load_file(&self) -> ConfigFile {
        fs::read_to_string(&self.config_path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the header set for a resolved credential. A token that cannot form a
/// valid header value is dropped, degrading the request to anonymous.
pub fn headers_for(credentials: &Credentials) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

    if let Some(token) = credentials.token.as_deref().filter(|t| !t.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&format!("token {}", token)) {
            headers.insert(AUTHORIZATION, value);
        }
    }

    headers
}
