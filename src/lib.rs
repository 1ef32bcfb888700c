//! adscout — sales-agent property discovery and publisher authorization
//! reconciliation.
//!
//! The engine answers two questions about an advertising agent fleet:
//! which properties does each agent claim to represent, and do the owning
//! publishers actually authorize those agents. A concurrent crawler sweeps
//! the fleet and fills a bidirectional [`PropertyIndex`]; the
//! [`AuthorizationValidator`] and [`PublisherTracker`] reconcile agent
//! claims against each publisher's `/.well-known/adagents.json` manifest.
//!
//! All state is in-memory and rebuilt by crawling; results are cached with
//! a per-entry TTL and refreshed on a fixed interval or on explicit
//! request.

pub mod authorization;
pub mod cache;
pub mod config;
pub mod crawl_engine;
pub mod manifest;
pub mod property_index;
pub mod publisher;

pub use authorization::{AuthorizationValidator, ValidationResult};
pub use cache::{TtlCache, DEFAULT_TTL};
pub use config::{DiscoveryConfig, DiscoveryConfigBuilder, PROPERTIES_OPERATION, WELL_KNOWN_PATH};
pub use crawl_engine::{
    properties_from_response, AgentCatalog, AgentClient, AgentDescriptor, AgentFailure, AgentKind,
    CrawlSummary, CrawlerStatus, DiscoveryCrawler, InMemoryCatalog, InvokeOutcome,
    ResponseShapeError,
};
pub use manifest::{
    fetch_manifest, normalize_agent_url, normalize_publisher_domain, AdAgentsManifest, AgentEntry,
    AuthorizedAgents, ManifestError,
};
pub use property_index::{
    AgentAuthorizations, IndexStats, Property, PropertyIdentifier, PropertyIndex, PropertyMatch,
    PropertyType,
};
pub use publisher::{
    coverage_percentage, DeploymentStats, DeploymentStatus, Issue, IssueSeverity, PublisherStatus,
    PublisherTracker,
};
