//! Publisher-side authorization checks for a single agent.
//!
//! Answers one question: does this publisher's `adagents.json` list this
//! agent? Failures never propagate to the caller — every outcome is a
//! [`ValidationResult`] with `authorized = false` and an explanatory error
//! when the manifest could not be fetched or understood.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::DiscoveryConfig;
use crate::manifest::{fetch_manifest, normalize_agent_url, normalize_publisher_domain};

/// Outcome of one authorization check, cached per `domain:agent_url` pair.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub domain: String,
    pub agent_url: String,
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

/// Checks whether a publisher's manifest authorizes a given agent.
pub struct AuthorizationValidator {
    http: reqwest::Client,
    config: DiscoveryConfig,
    cache: Mutex<TtlCache<String, ValidationResult>>,
}

impl AuthorizationValidator {
    pub fn new(config: DiscoveryConfig) -> reqwest::Result<Self> {
        let http = config.build_http_client()?;
        let cache = Mutex::new(TtlCache::new(config.cache_ttl()));
        Ok(Self { http, config, cache })
    }

    /// Check whether `agent_url` appears in `domain`'s manifest.
    ///
    /// The domain loses its scheme, trailing slash, and case; the agent URL
    /// only its trailing slash (paths stay case-sensitive). A cached result
    /// is returned without any network call until the TTL elapses.
    pub async fn validate(&self, domain: &str, agent_url: &str) -> ValidationResult {
        let domain = normalize_publisher_domain(domain);
        let agent_url = normalize_agent_url(agent_url);
        let cache_key = format!("{domain}:{agent_url}");

        if let Some(cached) = self.cache.lock().await.get(&cache_key) {
            debug!(%domain, %agent_url, "authorization cache hit");
            return cached;
        }

        let result = match fetch_manifest(&self.http, &self.config, &domain).await {
            Ok(manifest) => {
                let authorized = manifest
                    .agent_urls()
                    .iter()
                    .any(|listed| normalize_agent_url(listed) == agent_url);
                ValidationResult {
                    domain: domain.clone(),
                    agent_url: agent_url.clone(),
                    authorized,
                    error: None,
                    checked_at: Utc::now(),
                }
            }
            Err(e) => ValidationResult {
                domain: domain.clone(),
                agent_url: agent_url.clone(),
                authorized: false,
                error: Some(e.to_string()),
                checked_at: Utc::now(),
            },
        };

        self.cache.lock().await.set(cache_key, result.clone());
        result
    }

    /// Drop all cached results, forcing fresh fetches.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}
