//! Fleet discovery: concurrent sweep over agents and the collaborator
//! seams the engine depends on.

pub mod crawl_types;
pub mod crawler;

pub use crawl_types::{
    properties_from_response, AgentCatalog, AgentClient, AgentDescriptor, AgentFailure, AgentKind,
    CrawlSummary, CrawlerStatus, InMemoryCatalog, InvokeOutcome, ResponseShapeError,
};
pub use crawler::DiscoveryCrawler;
