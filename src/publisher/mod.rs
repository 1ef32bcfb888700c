//! Publisher manifest tracking: schema conformance and agent coverage.
//!
//! Where the authorization validator answers a yes/no question about one
//! agent, the tracker grades the whole manifest: is it deployed, is it on
//! the current schema revision, and how many of the agents we expected to
//! find are actually listed. Every defect becomes an actionable issue with
//! a suggested fix rather than an error returned to the caller.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use crate::cache::TtlCache;
use crate::config::DiscoveryConfig;
use crate::crawl_engine::{AgentDescriptor, AgentKind};
use crate::manifest::{
    fetch_manifest, normalize_agent_url, normalize_publisher_domain, AdAgentsManifest,
    AuthorizedAgents, ManifestError,
};

/// Classification of a publisher's manifest deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Well-formed on the current schema revision.
    Deployed,
    /// Usable agent list, but deprecated form and/or missing `properties`.
    SchemaOutdated,
    /// Present but broken: bad content type, malformed JSON, or invalid
    /// `authorized_agents`.
    Error,
    /// No manifest at the well-known location.
    Missing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Error,
    Warning,
}

/// One detected problem plus the remediation a publisher should apply.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
    pub fix: String,
}

impl Issue {
    fn error(message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Error,
            message: message.into(),
            fix: fix.into(),
        }
    }

    fn warning(message: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Warning,
            message: message.into(),
            fix: fix.into(),
        }
    }
}

/// Result of one publisher reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct PublisherStatus {
    pub domain: String,
    pub deployment_status: DeploymentStatus,
    pub issues: Vec<Issue>,
    /// Agent URLs extracted from the manifest (raw, as published).
    pub authorized_agents: Vec<String>,
    /// Agent URLs the caller expected to find.
    pub expected_agents: Vec<String>,
    pub coverage_percentage: u8,
    pub checked_at: DateTime<Utc>,
}

/// Counts per deployment status over currently cached publisher checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeploymentStats {
    pub deployed: usize,
    pub schema_outdated: usize,
    pub error: usize,
    pub missing: usize,
    pub total: usize,
}

/// Percentage of expected agents present in the authorized list, rounded
/// to the nearest integer; 0 when nothing is expected. Both sides are
/// compared through [`normalize_agent_url`].
#[must_use]
pub fn coverage_percentage(expected: &[String], authorized: &[String]) -> u8 {
    if expected.is_empty() {
        return 0;
    }
    let authorized: Vec<String> = authorized.iter().map(|u| normalize_agent_url(u)).collect();
    let matched = expected
        .iter()
        .filter(|e| authorized.contains(&normalize_agent_url(e)))
        .count();
    ((matched as f64 / expected.len() as f64) * 100.0).round() as u8
}

/// Tracks manifest deployment across the publishers claimed by a fleet.
pub struct PublisherTracker {
    http: reqwest::Client,
    config: DiscoveryConfig,
    cache: Mutex<TtlCache<String, PublisherStatus>>,
}

impl PublisherTracker {
    pub fn new(config: DiscoveryConfig) -> reqwest::Result<Self> {
        let http = config.build_http_client()?;
        let cache = Mutex::new(TtlCache::new(config.cache_ttl()));
        Ok(Self { http, config, cache })
    }

    /// Fetch and grade `domain`'s manifest against the agents expected to
    /// be listed there. Cached per domain for the configured TTL.
    pub async fn check_publisher(
        &self,
        domain: &str,
        expected_agents: &[String],
    ) -> PublisherStatus {
        let domain = normalize_publisher_domain(domain);

        if let Some(cached) = self.cache.lock().await.get(&domain) {
            debug!(%domain, "publisher status cache hit");
            return cached;
        }

        let status = match fetch_manifest(&self.http, &self.config, &domain).await {
            Ok(manifest) => self.grade_manifest(&domain, &manifest, expected_agents),
            Err(e) => Self::status_from_fetch_error(&domain, &e, expected_agents),
        };

        self.cache.lock().await.set(domain, status.clone());
        status
    }

    fn status_from_fetch_error(
        domain: &str,
        error: &ManifestError,
        expected_agents: &[String],
    ) -> PublisherStatus {
        let (deployment_status, issue) = if error.is_missing() {
            (
                DeploymentStatus::Missing,
                Issue::error(
                    error.to_string(),
                    "Deploy adagents.json at /.well-known/adagents.json",
                ),
            )
        } else {
            let fix = match error {
                ManifestError::WrongContentType(_) => {
                    "Serve adagents.json with Content-Type: application/json"
                }
                ManifestError::InvalidJson(_) => "Fix the JSON syntax of adagents.json",
                ManifestError::InvalidAuthorizedAgents => {
                    "Provide authorized_agents as an array of {\"url\": ...} objects"
                }
                _ => "Ensure the manifest is reachable over HTTPS",
            };
            (DeploymentStatus::Error, Issue::error(error.to_string(), fix))
        };

        PublisherStatus {
            domain: domain.to_string(),
            deployment_status,
            issues: vec![issue],
            authorized_agents: Vec::new(),
            expected_agents: expected_agents.to_vec(),
            coverage_percentage: coverage_percentage(expected_agents, &[]),
            checked_at: Utc::now(),
        }
    }

    fn grade_manifest(
        &self,
        domain: &str,
        manifest: &AdAgentsManifest,
        expected_agents: &[String],
    ) -> PublisherStatus {
        let mut issues = Vec::new();
        let mut outdated = false;
        let mut broken = false;

        match &manifest.authorized_agents {
            AuthorizedAgents::Deprecated(urls) if !urls.is_empty() => {
                outdated = true;
                issues.push(Issue::warning(
                    "authorized_agents uses the deprecated flat string format",
                    "Migrate each entry to an object with a \"url\" field",
                ));
            }
            AuthorizedAgents::Deprecated(_) => {}
            AuthorizedAgents::Entries(entries) => {
                if entries.iter().any(|e| e.url.trim().is_empty()) {
                    broken = true;
                    issues.push(Issue::error(
                        "authorized_agents contains an entry with an empty url",
                        "Set a non-empty agent URL on every entry",
                    ));
                }
            }
        }

        if manifest.properties.is_none() {
            outdated = true;
            issues.push(Issue::warning(
                "manifest has no properties array",
                "Declare the publisher's properties per the current schema revision",
            ));
        }
        if manifest.schema.is_none() {
            issues.push(Issue::warning(
                "manifest does not reference a $schema",
                "Add the $schema field pointing at the adagents.json schema",
            ));
        }
        if manifest.last_updated.is_none() {
            issues.push(Issue::warning(
                "manifest has no last_updated timestamp",
                "Add last_updated so consumers can judge staleness",
            ));
        }

        let authorized_agents = manifest.agent_urls();
        let coverage = coverage_percentage(expected_agents, &authorized_agents);
        let normalized_authorized: Vec<String> = authorized_agents
            .iter()
            .map(|u| normalize_agent_url(u))
            .collect();
        let unlisted: Vec<&String> = expected_agents
            .iter()
            .filter(|e| !normalized_authorized.contains(&normalize_agent_url(e)))
            .collect();
        if !unlisted.is_empty() {
            let listing = unlisted
                .iter()
                .map(|u| u.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            issues.push(Issue::warning(
                format!("expected agents not authorized: {listing}"),
                "Add the missing agents to authorized_agents",
            ));
        }

        let deployment_status = if broken {
            DeploymentStatus::Error
        } else if outdated {
            DeploymentStatus::SchemaOutdated
        } else {
            DeploymentStatus::Deployed
        };

        PublisherStatus {
            domain: domain.to_string(),
            deployment_status,
            issues,
            authorized_agents,
            expected_agents: expected_agents.to_vec(),
            coverage_percentage: coverage,
            checked_at: Utc::now(),
        }
    }

    /// Check every publisher domain claimed by the sales agents of a fleet,
    /// concurrently. Agents are grouped by the authority (host, plus port
    /// when present) of their own URL; each distinct domain is checked once
    /// with the grouped agent URLs as the expected list.
    pub async fn track_publishers(
        &self,
        agents: &[AgentDescriptor],
    ) -> HashMap<String, PublisherStatus> {
        let mut by_domain: HashMap<String, Vec<String>> = HashMap::new();
        for agent in agents {
            if agent.kind != AgentKind::Sales {
                continue;
            }
            let Some(domain) = authority_of(&agent.url) else {
                debug!(url = %agent.url, "skipping agent with unparseable URL");
                continue;
            };
            by_domain.entry(domain).or_default().push(agent.url.clone());
        }

        info!(publishers = by_domain.len(), "tracking publisher manifests");
        let checks = by_domain.into_iter().map(|(domain, expected)| async move {
            let status = self.check_publisher(&domain, &expected).await;
            (domain, status)
        });
        join_all(checks).await.into_iter().collect()
    }

    /// Aggregate cached publisher checks into per-status counts.
    pub async fn deployment_stats(&self) -> DeploymentStats {
        let cache = self.cache.lock().await;
        let mut stats = DeploymentStats::default();
        for status in cache.values() {
            stats.total += 1;
            match status.deployment_status {
                DeploymentStatus::Deployed => stats.deployed += 1,
                DeploymentStatus::SchemaOutdated => stats.schema_outdated += 1,
                DeploymentStatus::Error => stats.error += 1,
                DeploymentStatus::Missing => stats.missing += 1,
            }
        }
        stats
    }

    /// Drop all cached publisher statuses.
    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

/// Host (plus explicit port, when present) of an agent URL.
fn authority_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host,
    })
}
