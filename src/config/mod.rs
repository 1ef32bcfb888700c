//! Configuration for the discovery engine.
//!
//! A single [`DiscoveryConfig`] is shared (cloned) into the crawler, the
//! authorization validator, and the publisher tracker. Defaults match the
//! deployed protocol: `adagents.json` under `/.well-known/`, 15 minute
//! result caching, 5 second manifest fetch timeout.

use std::time::Duration;

use anyhow::{anyhow, Result};

/// Well-known path of the publisher authorization manifest.
pub const WELL_KNOWN_PATH: &str = ".well-known/adagents.json";

/// Agent operation that returns the properties an agent claims to represent.
pub const PROPERTIES_OPERATION: &str = "list_authorized_properties";

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CRAWL_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Runtime configuration shared by every discovery component.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub(crate) cache_ttl: Duration,
    pub(crate) fetch_timeout: Duration,
    pub(crate) crawl_interval: Duration,
    pub(crate) user_agent: String,
    pub(crate) well_known_path: String,
    pub(crate) manifest_scheme: String,
    pub(crate) properties_operation: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            crawl_interval: DEFAULT_CRAWL_INTERVAL,
            user_agent: format!("adscout/{}", env!("CARGO_PKG_VERSION")),
            well_known_path: WELL_KNOWN_PATH.to_string(),
            manifest_scheme: "https".to_string(),
            properties_operation: PROPERTIES_OPERATION.to_string(),
        }
    }
}

impl DiscoveryConfig {
    #[must_use]
    pub fn builder() -> DiscoveryConfigBuilder {
        DiscoveryConfigBuilder::default()
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }

    #[must_use]
    pub fn crawl_interval(&self) -> Duration {
        self.crawl_interval
    }

    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    #[must_use]
    pub fn properties_operation(&self) -> &str {
        &self.properties_operation
    }

    /// Full manifest URL for a (already normalized) publisher domain.
    #[must_use]
    pub fn manifest_url(&self, domain: &str) -> String {
        format!(
            "{}://{}/{}",
            self.manifest_scheme, domain, self.well_known_path
        )
    }

    /// HTTP client configured with this engine's identity and timeout.
    pub fn build_http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.fetch_timeout)
            .build()
    }
}

/// Fluent builder over [`DiscoveryConfig`] defaults.
#[derive(Debug, Default)]
pub struct DiscoveryConfigBuilder {
    config: DiscoveryConfig,
}

impl DiscoveryConfigBuilder {
    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn crawl_interval(mut self, interval: Duration) -> Self {
        self.config.crawl_interval = interval;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn well_known_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.config.well_known_path = path.trim_start_matches('/').to_string();
        self
    }

    /// Scheme used for manifest fetches. Exists so tests can point the
    /// fetch path at a plain-HTTP mock server; production callers keep the
    /// `https` default.
    #[must_use]
    pub fn manifest_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.manifest_scheme = scheme.into();
        self
    }

    #[must_use]
    pub fn properties_operation(mut self, operation: impl Into<String>) -> Self {
        self.config.properties_operation = operation.into();
        self
    }

    pub fn build(self) -> Result<DiscoveryConfig> {
        match self.config.manifest_scheme.as_str() {
            "http" | "https" => {}
            other => return Err(anyhow!("unsupported manifest scheme '{other}'")),
        }
        if self.config.fetch_timeout.is_zero() {
            return Err(anyhow!("fetch timeout must be non-zero"));
        }
        Ok(self.config)
    }
}
