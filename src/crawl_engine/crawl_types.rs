//! Core types and collaborator traits for the discovery sweep.
//!
//! The engine never talks a wire protocol itself: the communication layer
//! behind [`AgentClient`] invokes a named operation on a remote agent and
//! returns structured data or an error, applying its own timeout. The
//! static catalog behind [`AgentCatalog`] says which agents exist.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::property_index::{IndexStats, Property};

/// Role of an agent in the fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Sales,
    Creative,
    Signals,
}

/// Catalog record for one network-reachable agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AgentKind,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Structured result of one remote invocation. `success == false` carries
/// an error message; `success == true` carries response data.
#[derive(Debug, Clone)]
pub struct InvokeOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl InvokeOutcome {
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Communication layer contract: invoke a named operation on a remote
/// agent. Implementations must apply their own timeout and never hang
/// indefinitely; a timeout surfaces as an ordinary failed outcome.
#[async_trait]
pub trait AgentClient: Send + Sync {
    async fn invoke(
        &self,
        agent_url: &str,
        protocol_hint: Option<&str>,
        operation: &str,
        params: Value,
    ) -> InvokeOutcome;
}

/// Static catalog contract: list known agents, optionally by kind.
#[async_trait]
pub trait AgentCatalog: Send + Sync {
    async fn list_agents(&self, kind: Option<AgentKind>) -> Vec<AgentDescriptor>;
}

/// Catalog over a fixed descriptor list, for embedders that load their
/// fleet from configuration (and for tests).
pub struct InMemoryCatalog {
    agents: Vec<AgentDescriptor>,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(agents: Vec<AgentDescriptor>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl AgentCatalog for InMemoryCatalog {
    async fn list_agents(&self, kind: Option<AgentKind>) -> Vec<AgentDescriptor> {
        self.agents
            .iter()
            .filter(|a| kind.map_or(true, |k| a.kind == k))
            .cloned()
            .collect()
    }
}

/// An agent response that did not match any known properties-list shape.
#[derive(Debug, Clone, Error)]
pub enum ResponseShapeError {
    #[error("agent returned success without data")]
    Empty,
    #[error("unrecognized response shape: {0}")]
    Unrecognized(String),
    #[error("invalid property object: {0}")]
    InvalidProperty(String),
}

/// Normalize an agent's properties response into a validated list.
///
/// Exactly three shapes are accepted: a bare array of properties, an
/// object carrying a `properties` array, or a single property object.
/// Anything else is rejected rather than coerced.
pub fn properties_from_response(data: Value) -> Result<Vec<Property>, ResponseShapeError> {
    match data {
        Value::Array(items) => parse_items(items),
        Value::Object(map) => {
            if let Some(inner) = map.get("properties") {
                match inner {
                    Value::Array(items) => parse_items(items.clone()),
                    other => Err(ResponseShapeError::Unrecognized(format!(
                        "properties field is {}, expected an array",
                        json_kind(other)
                    ))),
                }
            } else {
                let single = serde_json::from_value::<Property>(Value::Object(map))
                    .map_err(|e| ResponseShapeError::InvalidProperty(e.to_string()))?;
                Ok(vec![single])
            }
        }
        other => Err(ResponseShapeError::Unrecognized(format!(
            "top-level {}",
            json_kind(&other)
        ))),
    }
}

fn parse_items(items: Vec<Value>) -> Result<Vec<Property>, ResponseShapeError> {
    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<Property>(item)
                .map_err(|e| ResponseShapeError::InvalidProperty(e.to_string()))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One agent that failed during a sweep, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct AgentFailure {
    pub agent_url: String,
    pub error: String,
}

/// Summary of one full sweep over the fleet.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub total_properties: usize,
    pub successful_agents: usize,
    pub failed_agents: usize,
    pub failures: Vec<AgentFailure>,
    pub completed_at: DateTime<Utc>,
}

impl CrawlSummary {
    /// Placeholder returned to concurrent callers before any sweep has
    /// completed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_properties: 0,
            successful_agents: 0,
            failed_agents: 0,
            failures: Vec::new(),
            completed_at: Utc::now(),
        }
    }
}

/// Read-only snapshot of the crawler.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlerStatus {
    pub crawling: bool,
    pub last_crawl: Option<DateTime<Utc>>,
    pub last_result: Option<CrawlSummary>,
    pub index: IndexStats,
}
