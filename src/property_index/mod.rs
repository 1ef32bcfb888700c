//! In-memory bidirectional index of agent property claims.
//!
//! The forward map records, per agent, the properties the agent claimed in
//! the most recent sweep. The reverse map is derived data: it maps a
//! normalized identifier key (`"<type>:<value>"`) to the set of agents
//! claiming a property with that identifier, and is rebuilt whenever an
//! agent's claim set changes. Claim sets are replaced wholesale per agent —
//! a re-crawl never merges with the previous claims, so stale properties
//! cannot linger.
//!
//! The index is a plain struct with no interior locking; the crawler owns
//! it behind an `Arc<RwLock<_>>` and is its only writer.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kind of sellable unit a publisher exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Website,
    MobileApp,
    CtvApp,
    Dooh,
    Podcast,
    Radio,
    StreamingAudio,
}

/// One typed identifier of a property, e.g. `{"type": "domain", "value": "nytimes.com"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyIdentifier {
    #[serde(rename = "type")]
    pub id_type: String,
    pub value: String,
}

/// A publisher-owned sellable unit claimed by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub property_type: PropertyType,
    pub name: String,
    pub identifiers: Vec<PropertyIdentifier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub publisher_domain: String,
}

/// One hit from a reverse lookup: the matched property together with the
/// claiming agent and the owning publisher.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyMatch {
    pub property: Property,
    pub agent_url: String,
    pub publisher_domain: String,
}

/// An agent's full current claim set plus the distinct publishers it spans.
#[derive(Debug, Clone, Serialize)]
pub struct AgentAuthorizations {
    pub agent_url: String,
    pub properties: Vec<Property>,
    pub publisher_domains: Vec<String>,
}

/// Aggregate counters for dashboards; not used for correctness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub agent_count: usize,
    pub property_count: usize,
    pub identifier_count: usize,
}

/// Bidirectional agent↔property mapping. See the module docs for ownership
/// and replacement semantics.
#[derive(Debug, Default)]
pub struct PropertyIndex {
    /// agent URL → claimed properties (wholesale per sweep)
    agents: HashMap<String, Vec<Property>>,
    /// `"<type>:<value>"` → agent URLs claiming a matching property
    reverse: HashMap<String, HashSet<String>>,
}

fn identifier_key(id_type: &str, value: &str) -> String {
    format!("{id_type}:{value}")
}

impl PropertyIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the claim set for `agent_url` and rebuild the
    /// reverse entries that reference it. The previous claims are discarded
    /// entirely; the reverse index never retains a reference to a property
    /// that is no longer in the forward map.
    ///
    /// A property without identifiers stays visible through the forward map
    /// but is skipped during reverse-index population (one malformed
    /// property must not discard the agent's whole claim set).
    pub fn replace_agent_properties(&mut self, agent_url: &str, properties: Vec<Property>) {
        if let Some(previous) = self.agents.remove(agent_url) {
            for property in &previous {
                for identifier in &property.identifiers {
                    let key = identifier_key(&identifier.id_type, &identifier.value);
                    if let Some(agents) = self.reverse.get_mut(&key) {
                        agents.remove(agent_url);
                        if agents.is_empty() {
                            self.reverse.remove(&key);
                        }
                    }
                }
            }
        }

        for property in &properties {
            if property.identifiers.is_empty() {
                warn!(
                    agent_url,
                    property = %property.name,
                    "property has no identifiers; skipping reverse indexing"
                );
                continue;
            }
            for identifier in &property.identifiers {
                let key = identifier_key(&identifier.id_type, &identifier.value);
                self.reverse
                    .entry(key)
                    .or_default()
                    .insert(agent_url.to_string());
            }
        }

        self.agents.insert(agent_url.to_string(), properties);
    }

    /// Every `{property, agent_url, publisher_domain}` triple whose property
    /// carries the given identifier. O(1) reverse lookup, then a scan of
    /// only the matching agents' claims to re-derive the full property.
    #[must_use]
    pub fn find_agents_for_property(&self, id_type: &str, value: &str) -> Vec<PropertyMatch> {
        let key = identifier_key(id_type, value);
        let Some(agent_urls) = self.reverse.get(&key) else {
            return Vec::new();
        };

        let mut matches = Vec::new();
        for agent_url in agent_urls {
            let Some(properties) = self.agents.get(agent_url) else {
                continue;
            };
            for property in properties {
                let hit = property
                    .identifiers
                    .iter()
                    .any(|id| id.id_type == id_type && id.value == value);
                if hit {
                    matches.push(PropertyMatch {
                        property: property.clone(),
                        agent_url: agent_url.clone(),
                        publisher_domain: property.publisher_domain.clone(),
                    });
                }
            }
        }
        matches
    }

    /// The agent's current claim set plus the distinct publisher domains it
    /// references, or `None` for an unknown agent.
    #[must_use]
    pub fn agent_authorizations(&self, agent_url: &str) -> Option<AgentAuthorizations> {
        let properties = self.agents.get(agent_url)?;
        let publisher_domains: BTreeSet<String> = properties
            .iter()
            .map(|p| p.publisher_domain.clone())
            .collect();
        Some(AgentAuthorizations {
            agent_url: agent_url.to_string(),
            properties: properties.clone(),
            publisher_domains: publisher_domains.into_iter().collect(),
        })
    }

    /// Empty both maps. Run before a fresh sweep so an agent dropped from
    /// the fleet cannot inherit stale claims.
    pub fn clear(&mut self) {
        self.agents.clear();
        self.reverse.clear();
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            agent_count: self.agents.len(),
            property_count: self.agents.values().map(Vec::len).sum(),
            identifier_count: self.reverse.len(),
        }
    }
}
