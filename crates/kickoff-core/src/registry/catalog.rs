//! Catalog of available templates, cached on disk with a one-hour TTL.
//!
//! The common case is a fresh cache: one disk read, zero network calls.
//! Stale or missing caches trigger the two-tier registry fetch; a successful
//! fetch overwrites the cache entry wholesale.

use crate::error::{Error, Result};
use crate::registry::config::TemplateConfig;
use crate::templates::transport::{Transport, REGISTRY_FILE};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Cache entries older than this are treated as absent.
pub const CACHE_TTL: Duration = Duration::from_secs(3600);

const CACHE_FILE: &str = "templates.json";

/// Variable classification within a template descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateVariables {
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub optional: Vec<String>,
    #[serde(default)]
    pub generated: Vec<String>,
}

/// Template metadata as stored in the registry, keyed externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateBody {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stack: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub supports: Vec<String>,
    #[serde(default)]
    pub post_install: Vec<String>,
    #[serde(default)]
    pub variables: TemplateVariables,
}

/// A template descriptor joined with its catalog key.
#[derive(Debug, Clone)]
pub struct Template {
    pub key: String,
    pub body: TemplateBody,
}

/// Registry document at the repository root.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    templates: BTreeMap<String, TemplateBody>,
}

/// On-disk cache entry: fetch instant plus the full template set.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    /// Milliseconds since the epoch.
    timestamp: u64,
    templates: BTreeMap<String, TemplateBody>,
}

/// Catalog access with the disk cache in front of the remote registry.
pub struct Catalog {
    transport: Transport,
    cache_dir: PathBuf,
}

impl Catalog {
    /// Catalog cached under `~/.kickoff/templates-cache`.
    pub fn new(transport: Transport) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            transport,
            cache_dir: home.join(".kickoff").join("templates-cache"),
        }
    }

    /// Catalog with an explicit cache directory.
    pub fn with_cache_dir(transport: Transport, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            transport,
            cache_dir: cache_dir.into(),
        }
    }

    /// All templates, key-ordered. Served from the cache when fresh;
    /// otherwise fetched, cached, and returned.
    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        if let Some(templates) = self.read_fresh_cache() {
            return Ok(to_vec(templates));
        }

        let registry: RegistryFile = self
            .transport
            .fetch_json(REGISTRY_FILE)
            .await
            .map_err(|e| Error::RegistryUnavailable {
                reason: e.to_string(),
            })?;

        self.write_cache(&registry.templates)?;
        Ok(to_vec(registry.templates))
    }

    /// One template by key, or [`Error::TemplateNotFound`].
    pub async fn template(&self, key: &str) -> Result<Template> {
        self.list_templates()
            .await?
            .into_iter()
            .find(|t| t.key == key)
            .ok_or_else(|| Error::TemplateNotFound {
                name: key.to_string(),
            })
    }

    /// Whether the catalog lists `key`.
    pub async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.list_templates().await?.iter().any(|t| t.key == key))
    }

    /// Drop the cache directory and refetch. The `--update` flow.
    pub async fn refresh(&self) -> Result<Vec<Template>> {
        match fs::remove_dir_all(&self.cache_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.list_templates().await
    }

    /// Per-template configuration (prompt specs, generated values), fetched
    /// fresh on every invocation - never written to disk. Any failure
    /// degrades to an empty configuration carrying the template's key.
    pub async fn template_config(&self, key: &str) -> TemplateConfig {
        let path = format!("{}/template.json", key);
        match self.transport.fetch_json(&path).await {
            Ok(config) => config,
            Err(_) => TemplateConfig {
                name: key.to_string(),
                ..TemplateConfig::default()
            },
        }
    }

    /// Cache directory backing this catalog.
    pub fn cache_dir(&self) -> &std::path::Path {
        &self.cache_dir
    }

    fn cache_file(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    /// Cached template set, only when younger than [`CACHE_TTL`]. Unreadable
    /// or stale entries count as absent.
    fn read_fresh_cache(&self) -> Option<BTreeMap<String, TemplateBody>> {
        let content = fs::read_to_string(self.cache_file()).ok()?;
        let cached: CacheFile = serde_json::from_str(&content).ok()?;

        let age = now_millis().saturating_sub(cached.timestamp);
        if age < CACHE_TTL.as_millis() as u64 {
            Some(cached.templates)
        } else {
            None
        }
    }

    fn write_cache(&self, templates: &BTreeMap<String, TemplateBody>) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let entry = CacheFile {
            timestamp: now_millis(),
            templates: templates.clone(),
        };
        let json = serde_json::to_string(&entry).map_err(|e| Error::Other(e.into()))?;
        fs::write(self.cache_file(), json)?;
        Ok(())
    }
}

fn to_vec(templates: BTreeMap<String, TemplateBody>) -> Vec<Template> {
    templates
        .into_iter()
        .map(|(key, body)| Template { key, body })
        .collect()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthStore;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn registry_json() -> serde_json::Value {
        serde_json::json!({
            "templates": {
                "react-vite-tailwind": {
                    "name": "React + Vite + Tailwind",
                    "description": "Modern React frontend",
                    "category": "frontend",
                    "stack": ["react", "vite", "tailwind"],
                    "features": ["Fast HMR"],
                    "supports": ["hot-reload"],
                    "postInstall": ["npm install"],
                    "variables": { "required": [], "optional": ["apiBaseUrl"], "generated": [] }
                },
                "nestjs-jwt-postgres": {
                    "name": "NestJS + JWT + PostgreSQL",
                    "description": "Backend API",
                    "category": "backend"
                }
            }
        })
    }

    fn catalog_for(server_url: &str, cache_dir: &std::path::Path) -> Catalog {
        let auth = AuthStore::with_path("/nonexistent/kickoff-test-config.json");
        let transport =
            Transport::with_endpoints(auth, "acme/boilerplates", server_url, server_url);
        Catalog::with_cache_dir(transport, cache_dir)
    }

    fn write_cache_entry(dir: &std::path::Path, timestamp: u64) {
        fs::create_dir_all(dir).unwrap();
        let entry = serde_json::json!({
            "timestamp": timestamp,
            "templates": {
                "cached-template": { "name": "Cached", "description": "", "category": "frontend" }
            }
        });
        fs::write(dir.join(CACHE_FILE), entry.to_string()).unwrap();
    }

    #[tokio::test]
    async fn fresh_cache_serves_without_network() {
        let temp = TempDir::new().unwrap();
        write_cache_entry(temp.path(), now_millis());

        // An unroutable endpoint: any network attempt would fail the call.
        let catalog = catalog_for("http://127.0.0.1:9", temp.path());

        let templates = catalog.list_templates().await.unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].key, "cached-template");
    }

    #[tokio::test]
    async fn stale_cache_triggers_fetch_and_rewrite() {
        let server = MockServer::start_async().await;
        let encoded = BASE64.encode(registry_json().to_string());
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/boilerplates/contents/templates.json");
                then.status(200)
                    .json_body(serde_json::json!({ "content": encoded }));
            })
            .await;

        let temp = TempDir::new().unwrap();
        let two_hours_ago = now_millis() - 2 * 3600 * 1000;
        write_cache_entry(temp.path(), two_hours_ago);

        let catalog = catalog_for(&server.base_url(), temp.path());
        let templates = catalog.list_templates().await.unwrap();

        // Key-ordered result from the remote registry, not the stale cache.
        assert_eq!(templates.len(), 2);
        assert_eq!(templates[0].key, "nestjs-jwt-postgres");
        assert_eq!(templates[1].key, "react-vite-tailwind");
        assert_eq!(templates[1].body.post_install, vec!["npm install"]);

        // Cache rewritten with a current timestamp.
        let cached: CacheFile =
            serde_json::from_str(&fs::read_to_string(temp.path().join(CACHE_FILE)).unwrap())
                .unwrap();
        assert!(now_millis() - cached.timestamp < 60_000);
        assert_eq!(cached.templates.len(), 2);
    }

    #[tokio::test]
    async fn raw_fallback_still_populates_cache() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/boilerplates/contents/templates.json");
                then.status(500);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/acme/boilerplates/main/templates.json");
                then.status(200).body(registry_json().to_string());
            })
            .await;

        let temp = TempDir::new().unwrap();
        let catalog = catalog_for(&server.base_url(), temp.path());

        let templates = catalog.list_templates().await.unwrap();
        assert_eq!(templates.len(), 2);
        assert!(temp.path().join(CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn unparseable_api_payload_falls_back_to_raw() {
        let server = MockServer::start_async().await;
        let encoded = BASE64.encode(b"this is not json");
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/boilerplates/contents/templates.json");
                then.status(200)
                    .json_body(serde_json::json!({ "content": encoded }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/acme/boilerplates/main/templates.json");
                then.status(200).body(registry_json().to_string());
            })
            .await;

        let temp = TempDir::new().unwrap();
        let catalog = catalog_for(&server.base_url(), temp.path());

        let templates = catalog.list_templates().await.unwrap();
        assert_eq!(templates.len(), 2);
        assert!(temp.path().join(CACHE_FILE).exists());
    }

    #[tokio::test]
    async fn both_tiers_failing_is_registry_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_matches(".*");
                then.status(500);
            })
            .await;

        let temp = TempDir::new().unwrap();
        let catalog = catalog_for(&server.base_url(), temp.path());

        let err = catalog.list_templates().await.unwrap_err();
        assert!(matches!(err, Error::RegistryUnavailable { .. }));
    }

    #[tokio::test]
    async fn refresh_discards_fresh_cache() {
        let server = MockServer::start_async().await;
        let encoded = BASE64.encode(registry_json().to_string());
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/repos/acme/boilerplates/contents/templates.json");
                then.status(200)
                    .json_body(serde_json::json!({ "content": encoded }));
            })
            .await;

        let temp = TempDir::new().unwrap();
        let cache_dir = temp.path().join("cache");
        write_cache_entry(&cache_dir, now_millis());

        let catalog = catalog_for(&server.base_url(), &cache_dir);
        let templates = catalog.refresh().await.unwrap();

        assert_eq!(templates.len(), 2);
        assert!(templates.iter().all(|t| t.key != "cached-template"));
    }

    #[tokio::test]
    async fn unknown_key_is_template_not_found() {
        let temp = TempDir::new().unwrap();
        write_cache_entry(temp.path(), now_millis());

        let catalog = catalog_for("http://127.0.0.1:9", temp.path());
        let err = catalog.template("no-such").await.unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound { name } if name == "no-such"));
    }

    #[tokio::test]
    async fn template_config_degrades_to_empty() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path_matches(".*");
                then.status(500);
            })
            .await;

        let temp = TempDir::new().unwrap();
        let catalog = catalog_for(&server.base_url(), temp.path());

        let config = catalog.template_config("react-vite-tailwind").await;
        assert_eq!(config.name, "react-vite-tailwind");
        assert!(config.prompts.is_empty());
        assert!(config.generated_vars.is_empty());
    }
}
