use crate::error::ScrapeError;
use crate::repository::{RepositoryConfig, SqliteRepositoryConfig, REPOSITORY_INMEM, REPOSITORY_SQLITE};
use anyhow::{anyhow, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub username: String,
    pub password: String,
    pub scrape_interval_seconds: u64,
    pub repository: RepositoryConfig,
    /// Backend name that was not recognised and replaced by the in-memory store.
    pub repository_fallback_from: Option<String>,
    pub sink_url: Option<String>,
    pub sink_token: Option<String>,
    pub http_timeout_seconds: u64,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let base_url = env_string("RECEIVER_BASE_URL", Some(String::new()))?;
        let username = env_string("RECEIVER_USERNAME", Some(String::new()))?;
        let password = env_string("RECEIVER_PASSWORD", Some(String::new()))?;
        let scrape_interval_seconds = env_u64("RECEIVER_SCRAPE_INTERVAL_SECONDS", None)?;
        let (repository, repository_fallback_from) = repository_from_parts(
            env_optional("RECEIVER_REPOSITORY").as_deref(),
            env_optional("RECEIVER_REPOSITORY_DB_PATH"),
        );
        let sink_url = env_optional("RECEIVER_SINK_URL");
        let sink_token = env_optional("RECEIVER_SINK_TOKEN");
        let http_timeout_seconds = env_u64("RECEIVER_HTTP_TIMEOUT_SECONDS", Some(30))?;
        let otlp_endpoint = env_optional("OTEL_EXPORTER_OTLP_ENDPOINT");

        let config = Self {
            base_url,
            username,
            password,
            scrape_interval_seconds,
            repository,
            repository_fallback_from,
            sink_url,
            sink_token,
            http_timeout_seconds,
            otlp_endpoint,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScrapeError> {
        let invalid = |message: &str| Err(ScrapeError::ConfigInvalid(message.to_string()));
        if self.base_url.trim().is_empty() {
            return invalid("base url is invalid");
        }
        match Url::parse(self.base_url.trim()) {
            Ok(url) if url.cannot_be_a_base() => {
                return invalid("base url cannot carry a path");
            }
            Ok(_) => {}
            Err(_) => return invalid("base url does not parse as a URL"),
        }
        if self.username.trim().is_empty() {
            return invalid("username is invalid");
        }
        if self.password.is_empty() {
            return invalid("password is invalid");
        }
        if self.scrape_interval_seconds == 0 {
            return invalid("scrape interval must be at least one second");
        }
        if let RepositoryConfig::Sqlite(cfg) = &self.repository {
            if cfg.db_path.as_os_str().is_empty() {
                return invalid("sqlite repository requires a db path");
            }
        }
        Ok(())
    }

    pub fn scrape_interval(&self) -> Duration {
        Duration::from_secs(self.scrape_interval_seconds)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    /// Reports settings that were silently replaced while loading. Call once tracing is up.
    pub fn log_fallbacks(&self) {
        if let Some(name) = self.repository_fallback_from.as_deref() {
            tracing::warn!(
                repository = name,
                fallback = self.repository.name(),
                "unknown asset metric repository; falling back to inmem"
            );
        }
    }
}

/// Unknown backend names fall back to the in-memory store; the unknown name is returned
/// alongside so it can be reported.
fn repository_from_parts(
    name: Option<&str>,
    db_path: Option<String>,
) -> (RepositoryConfig, Option<String>) {
    match name.map(str::to_ascii_lowercase).as_deref() {
        Some(REPOSITORY_SQLITE) => (
            RepositoryConfig::Sqlite(SqliteRepositoryConfig {
                db_path: PathBuf::from(db_path.unwrap_or_default()),
            }),
            None,
        ),
        None | Some(REPOSITORY_INMEM) => (RepositoryConfig::InMemory, None),
        Some(_) => (RepositoryConfig::InMemory, name.map(str::to_string)),
    }
}

fn env_string(key: &str, default: Option<String>) -> Result<String> {
    match env::var(key) {
        Ok(value) => Ok(value.trim().to_string()),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_u64(key: &str, default: Option<u64>) -> Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .with_context(|| format!("invalid {key}")),
        Err(_) => default.ok_or_else(|| anyhow!("missing env var {key}")),
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
