//! Shared helpers for the adscout integration test suite.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use adscout::{AgentClient, DiscoveryConfig, InvokeOutcome};
use async_trait::async_trait;
use mockito::{Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::collections::HashMap;
use tokio::sync::Notify;

/// Config pointed at a mockito server: plain HTTP, short timeout.
#[allow(dead_code)]
pub fn test_config() -> DiscoveryConfig {
    DiscoveryConfig::builder()
        .manifest_scheme("http")
        .fetch_timeout(std::time::Duration::from_secs(2))
        .build()
        .expect("test config must build")
}

/// The domain (host:port) a mockito server answers on.
#[allow(dead_code)]
pub fn server_domain(server: &Server) -> String {
    server.host_with_port()
}

/// Mounts `/.well-known/adagents.json` returning the given JSON body.
#[allow(dead_code)]
pub async fn manifest_mock(server: &mut ServerGuard, body: &Value) -> Mock {
    server
        .mock("GET", "/.well-known/adagents.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await
}

/// Manifest that is fully conformant with the current schema revision.
#[allow(dead_code)]
pub fn conformant_manifest(agent_urls: &[&str]) -> Value {
    let agents: Vec<Value> = agent_urls.iter().map(|u| json!({ "url": u })).collect();
    json!({
        "$schema": "https://adcontextprotocol.org/schemas/v1/adagents.json",
        "authorized_agents": agents,
        "properties": [],
        "last_updated": "2026-08-01T00:00:00Z",
    })
}

/// A property claim as an agent would return it.
#[allow(dead_code)]
pub fn website_property(name: &str, domain: &str) -> Value {
    json!({
        "property_type": "website",
        "name": name,
        "identifiers": [{"type": "domain", "value": domain}],
        "publisher_domain": domain,
    })
}

/// Scriptable in-memory communication layer: each agent URL maps to a
/// canned outcome. Counts invocations; optionally blocks every call until
/// released, to hold a sweep in flight.
#[allow(dead_code)]
pub struct FakeAgentClient {
    outcomes: HashMap<String, InvokeOutcome>,
    pub invocations: AtomicUsize,
    gate: Option<Arc<Notify>>,
}

#[allow(dead_code)]
impl FakeAgentClient {
    pub fn new(outcomes: HashMap<String, InvokeOutcome>) -> Self {
        Self {
            outcomes,
            invocations: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every invocation waits on the returned notify before answering.
    pub fn gated(outcomes: HashMap<String, InvokeOutcome>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let client = Self {
            outcomes,
            invocations: AtomicUsize::new(0),
            gate: Some(Arc::clone(&gate)),
        };
        (client, gate)
    }

    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentClient for FakeAgentClient {
    async fn invoke(
        &self,
        agent_url: &str,
        _protocol_hint: Option<&str>,
        _operation: &str,
        _params: Value,
    ) -> InvokeOutcome {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.outcomes
            .get(agent_url)
            .cloned()
            .unwrap_or_else(|| InvokeOutcome::failure("unknown agent"))
    }
}
