use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Connection settings carried by an index definition.
///
/// `hosts` is the literal configured string, e.g.
/// `"http://es-1:9200,http://es-2:9200"`. It doubles as the connection cache
/// key, so two definitions with the same string share one client.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub hosts: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl BackendConfig {
    pub fn new(hosts: impl Into<String>) -> Self {
        BackendConfig {
            hosts: Some(hosts.into()),
            username: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, username: &str, password: &str) -> Self {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
        self
    }

    /// The configured host string, or `MissingConfiguration` when absent or blank.
    pub fn hosts_key(&self) -> Result<&str> {
        match self.hosts.as_deref().map(str::trim) {
            Some(h) if !h.is_empty() => Ok(h),
            _ => Err(IndexError::MissingConfiguration(
                "No hosts defined for the search backend".to_string(),
            )),
        }
    }

    pub fn host_list(&self) -> Result<Vec<String>> {
        Ok(self
            .hosts_key()?
            .split(',')
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty())
            .collect())
    }

    /// Basic-auth credentials, only when both halves are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Source of the currently configured languages.
pub trait LanguageProvider: Send + Sync {
    fn valid_languages(&self) -> Vec<String>;
}

fn default_prefix() -> String {
    "catalog_index".to_string()
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_shards() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_shards")]
    pub number_of_shards: u32,
    #[serde(default)]
    pub number_of_replicas: u32,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        WorkerConfig {
            prefix: default_prefix(),
            languages: default_languages(),
            number_of_shards: default_shards(),
            number_of_replicas: 0,
            request_timeout_secs: None,
        }
    }
}

impl WorkerConfig {
    /// Load from a JSON file if present, then apply `CATALOG_INDEX_*`
    /// environment overrides. A missing or unparsable file yields defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let mut config = match path {
            Some(path) if path.exists() => match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<WorkerConfig>(&content) {
                    Ok(config) => {
                        tracing::info!(
                            "Loaded worker config: prefix={}, languages={}",
                            config.prefix,
                            config.languages.len()
                        );
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse {}: {}, using defaults",
                            path.display(),
                            e
                        );
                        WorkerConfig::default()
                    }
                },
                Err(e) => {
                    tracing::error!("Failed to read {}: {}, using defaults", path.display(), e);
                    WorkerConfig::default()
                }
            },
            _ => WorkerConfig::default(),
        };

        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(prefix) = std::env::var("CATALOG_INDEX_PREFIX") {
            if !prefix.trim().is_empty() {
                self.prefix = prefix.trim().to_string();
            }
        }
        if let Ok(languages) = std::env::var("CATALOG_INDEX_LANGUAGES") {
            let parsed: Vec<String> = languages
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if !parsed.is_empty() {
                self.languages = parsed;
            }
        }
        if let Some(shards) = env_u32("CATALOG_INDEX_SHARDS") {
            self.number_of_shards = shards;
        }
        if let Some(replicas) = env_u32("CATALOG_INDEX_REPLICAS") {
            self.number_of_replicas = replicas;
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl LanguageProvider for WorkerConfig {
    fn valid_languages(&self) -> Vec<String> {
        self.languages.clone()
    }
}

fn env_u32(name: &str) -> Option<u32> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}={}", name, raw);
            None
        }
    }
}
