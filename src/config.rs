use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// `sqlite:...` URL, or `memory` for a store that lives only as long as the process
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub feed: FeedConfig,
    /// Bearer secret for writes. Only ever taken from the environment.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite:articles.db?mode=rwc".to_string()
}

/// Channel metadata for the generated RSS document.
#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_feed_title")]
    pub title: String,
    #[serde(default = "default_feed_description")]
    pub description: String,
    #[serde(default = "default_feed_language")]
    pub language: String,
    #[serde(default = "default_feed_path")]
    pub path: String,
}

fn default_feed_title() -> String {
    "My Saved Articles".to_string()
}

fn default_feed_description() -> String {
    "Articles and links saved for later reading.".to_string()
}

fn default_feed_language() -> String {
    "en-us".to_string()
}

/// Paths the router already serves; the feed cannot be mounted on them.
const RESERVED_PATHS: &[&str] = &["/health", "/api/add-article"];

fn default_feed_path() -> String {
    "/rss.xml".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            title: default_feed_title(),
            description: default_feed_description(),
            language: default_feed_language(),
            path: default_feed_path(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            database_url: default_database_url(),
            feed: FeedConfig::default(),
            api_key: None,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Apply `DATABASE_URL`, `BIND_ADDRESS` and `ADD_ARTICLE_API_KEY` overrides.
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`. An empty API key is
    /// treated the same as an absent one.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.bind_address = addr;
        }
        self.api_key = lookup("ADD_ARTICLE_API_KEY").filter(|key| !key.is_empty());
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.feed.path.starts_with('/') || self.feed.path.len() < 2 {
            anyhow::bail!("feed.path must be an absolute path like /rss.xml, got {:?}", self.feed.path);
        }
        if RESERVED_PATHS.contains(&self.feed.path.as_str()) {
            anyhow::bail!("feed.path {:?} is already used by another route", self.feed.path);
        }
        if self.feed.path.contains([':', '*', '{', '}']) {
            anyhow::bail!("feed.path must be a literal path, got {:?}", self.feed.path);
        }
        if self.database_url.is_empty() {
            anyhow::bail!("database_url must not be empty");
        }
        Ok(())
    }
}
