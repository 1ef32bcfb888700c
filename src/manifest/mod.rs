//! Fetching and parsing of publisher authorization manifests.
//!
//! Publishers declare which agents may represent them in an `adagents.json`
//! document served under `/.well-known/` on their own domain. This module
//! owns the HTTP fetch (with the engine's identity headers and timeout),
//! the failure taxonomy, and the normalization rules used everywhere a
//! domain or agent URL is compared.

use reqwest::header;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::DiscoveryConfig;

/// Why a manifest could not be obtained or understood. The variants follow
/// the transport / protocol / schema split: callers map them onto
/// deployment statuses and human-readable issues, they never bubble out of
/// the public validator/tracker API.
#[derive(Debug, Clone, Error)]
pub enum ManifestError {
    /// 404-class response: the publisher has not deployed a manifest.
    #[error("adagents.json not found (HTTP {0})")]
    NotFound(u16),
    /// Any other non-2xx response.
    #[error("HTTP {0}")]
    Http(u16),
    #[error("wrong content type: expected application/json, got {0}")]
    WrongContentType(String),
    #[error("invalid JSON: {0}")]
    InvalidJson(String),
    /// JSON parsed but `authorized_agents` is missing or not in a known form.
    #[error("invalid or missing authorized_agents array")]
    InvalidAuthorizedAgents,
    /// DNS, connect, or timeout failure from the HTTP layer.
    #[error("{0}")]
    Transport(String),
}

impl ManifestError {
    /// Whether this failure means the manifest file is absent, as opposed
    /// to present-but-broken.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Entry of the current `authorized_agents` form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentEntry {
    pub url: String,
    #[serde(default)]
    pub authorized_for: Option<String>,
}

/// The two wire forms of `authorized_agents`: the current list of objects,
/// and the deprecated flat list of URL strings. Anything else fails to
/// parse — there is no best-effort coercion.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AuthorizedAgents {
    Entries(Vec<AgentEntry>),
    Deprecated(Vec<String>),
}

/// Parsed publisher authorization manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct AdAgentsManifest {
    #[serde(rename = "$schema")]
    pub schema: Option<String>,
    pub authorized_agents: AuthorizedAgents,
    /// Property declarations from the newer protocol revision. Only their
    /// presence matters for schema conformance, so entries stay untyped.
    #[serde(default)]
    pub properties: Option<Vec<Value>>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl AdAgentsManifest {
    /// Raw agent URLs, regardless of which wire form the manifest used.
    #[must_use]
    pub fn agent_urls(&self) -> Vec<String> {
        match &self.authorized_agents {
            AuthorizedAgents::Entries(entries) => {
                entries.iter().map(|e| e.url.clone()).collect()
            }
            AuthorizedAgents::Deprecated(urls) => urls.clone(),
        }
    }

    #[must_use]
    pub fn uses_deprecated_form(&self) -> bool {
        matches!(&self.authorized_agents, AuthorizedAgents::Deprecated(urls) if !urls.is_empty())
    }
}

/// Strip scheme and trailing slashes from a publisher domain and lowercase
/// it. DNS names are case-insensitive; anything after the authority is
/// dropped.
#[must_use]
pub fn normalize_publisher_domain(input: &str) -> String {
    let trimmed = input.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let authority = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or(without_scheme);
    authority.to_lowercase()
}

/// Trim trailing slashes from an agent URL. Scheme and case are preserved:
/// URL paths are case-sensitive, so this is the only safe equivalence the
/// engine applies when comparing agent URLs.
#[must_use]
pub fn normalize_agent_url(input: &str) -> String {
    input.trim().trim_end_matches('/').to_string()
}

/// Interpret a JSON document as a manifest. Split out of the fetch so that
/// schema failures are distinguishable from transport/protocol ones.
pub fn parse_manifest(value: Value) -> Result<AdAgentsManifest, ManifestError> {
    if !value
        .get("authorized_agents")
        .is_some_and(Value::is_array)
    {
        return Err(ManifestError::InvalidAuthorizedAgents);
    }
    serde_json::from_value(value).map_err(|_| ManifestError::InvalidAuthorizedAgents)
}

/// GET `{scheme}://{domain}/.well-known/adagents.json` and parse the body.
///
/// `domain` must already be normalized. Every failure mode is folded into
/// a [`ManifestError`]; the per-request timeout comes from the client
/// configuration built via [`DiscoveryConfig::build_http_client`].
pub async fn fetch_manifest(
    client: &reqwest::Client,
    config: &DiscoveryConfig,
    domain: &str,
) -> Result<AdAgentsManifest, ManifestError> {
    let url = config.manifest_url(domain);
    debug!(%url, "fetching authorization manifest");

    let response = client
        .get(&url)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| ManifestError::Transport(e.to_string()))?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND || status == reqwest::StatusCode::GONE {
        return Err(ManifestError::NotFound(status.as_u16()));
    }
    if !status.is_success() {
        return Err(ManifestError::Http(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.contains("json") {
        return Err(ManifestError::WrongContentType(content_type));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ManifestError::Transport(e.to_string()))?;
    let value: Value =
        serde_json::from_str(&body).map_err(|e| ManifestError::InvalidJson(e.to_string()))?;
    parse_manifest(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_publisher_domains() {
        assert_eq!(normalize_publisher_domain("https://NYTimes.com/"), "nytimes.com");
        assert_eq!(normalize_publisher_domain("http://pub.test/path"), "pub.test");
        assert_eq!(normalize_publisher_domain("  Example.ORG  "), "example.org");
        assert_eq!(normalize_publisher_domain("127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[test]
    fn normalizes_agent_urls_preserving_scheme_and_case() {
        assert_eq!(
            normalize_agent_url("https://sales.example.com/"),
            "https://sales.example.com"
        );
        assert_eq!(
            normalize_agent_url("https://sales.example.com/A2A/"),
            "https://sales.example.com/A2A"
        );
        assert_eq!(normalize_agent_url("https://x.test"), "https://x.test");
    }

    #[test]
    fn parses_current_form() {
        let manifest = parse_manifest(json!({
            "$schema": "https://adcontextprotocol.org/schemas/v1/adagents.json",
            "authorized_agents": [
                {"url": "https://sales.example.com", "authorized_for": "display"}
            ],
            "properties": [],
            "last_updated": "2026-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(!manifest.uses_deprecated_form());
        assert_eq!(manifest.agent_urls(), vec!["https://sales.example.com"]);
        assert!(manifest.schema.is_some());
        assert!(manifest.properties.is_some());
    }

    #[test]
    fn parses_deprecated_flat_string_form() {
        let manifest = parse_manifest(json!({
            "authorized_agents": ["https://sales.example.com", "https://other.example"]
        }))
        .unwrap();

        assert!(manifest.uses_deprecated_form());
        assert_eq!(manifest.agent_urls().len(), 2);
        assert!(manifest.properties.is_none());
    }

    #[test]
    fn rejects_missing_authorized_agents() {
        let err = parse_manifest(json!({"properties": []})).unwrap_err();
        assert!(matches!(err, ManifestError::InvalidAuthorizedAgents));
    }

    #[test]
    fn rejects_structurally_invalid_authorized_agents() {
        for bad in [
            json!({"authorized_agents": 42}),
            json!({"authorized_agents": {"url": "https://x.test"}}),
            json!({"authorized_agents": [42]}),
            json!({"authorized_agents": [{"name": "no url"}]}),
        ] {
            let err = parse_manifest(bad).unwrap_err();
            assert!(matches!(err, ManifestError::InvalidAuthorizedAgents));
        }
    }

    #[test]
    fn empty_array_is_valid_and_current_form() {
        let manifest = parse_manifest(json!({"authorized_agents": []})).unwrap();
        assert!(!manifest.uses_deprecated_form());
        assert!(manifest.agent_urls().is_empty());
    }
}
