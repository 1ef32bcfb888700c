//! Concurrent sweep over the agent fleet.
//!
//! One sweep queries every agent for its claimed properties in parallel and
//! installs each successful response into the property index as it settles.
//! Per-agent outcomes are isolated: one agent failing, timing out, or
//! returning garbage never aborts the sweep or rolls back another agent's
//! already-applied install. A single-flight guard keeps at most one sweep
//! in flight; concurrent callers immediately observe the previous summary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::json;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::crawl_types::{
    properties_from_response, AgentClient, AgentDescriptor, AgentFailure, CrawlSummary,
    CrawlerStatus,
};
use crate::config::DiscoveryConfig;
use crate::manifest::normalize_agent_url;
use crate::property_index::PropertyIndex;

/// Per-agent outcome of one sweep.
enum AgentOutcome {
    Installed { properties: usize },
    Failed(AgentFailure),
}

#[derive(Default)]
struct LastCrawl {
    at: Option<DateTime<Utc>>,
    result: Option<CrawlSummary>,
}

struct PeriodicTask {
    handle: JoinHandle<()>,
    stop: watch::Sender<bool>,
}

/// Orchestrates discovery sweeps and owns the property index.
pub struct DiscoveryCrawler {
    client: Arc<dyn AgentClient>,
    index: Arc<RwLock<PropertyIndex>>,
    config: DiscoveryConfig,
    crawling: AtomicBool,
    last: RwLock<LastCrawl>,
    periodic: Mutex<Option<PeriodicTask>>,
}

impl DiscoveryCrawler {
    #[must_use]
    pub fn new(config: DiscoveryConfig, client: Arc<dyn AgentClient>) -> Self {
        Self::with_index(config, client, Arc::new(RwLock::new(PropertyIndex::new())))
    }

    /// Construct around an externally owned index, for callers that share
    /// it with read-side services.
    #[must_use]
    pub fn with_index(
        config: DiscoveryConfig,
        client: Arc<dyn AgentClient>,
        index: Arc<RwLock<PropertyIndex>>,
    ) -> Self {
        Self {
            client,
            index,
            config,
            crawling: AtomicBool::new(false),
            last: RwLock::new(LastCrawl::default()),
            periodic: Mutex::new(None),
        }
    }

    /// Shared handle to the property index populated by sweeps.
    #[must_use]
    pub fn index(&self) -> Arc<RwLock<PropertyIndex>> {
        Arc::clone(&self.index)
    }

    /// Run one full sweep over `agents`.
    ///
    /// If a sweep is already in flight this does not queue or wait: it
    /// returns the last completed summary unchanged (an empty one if no
    /// sweep has finished yet) and leaves the index untouched.
    pub async fn crawl_all_agents(&self, agents: &[AgentDescriptor]) -> CrawlSummary {
        if self
            .crawling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("sweep already in flight; returning previous summary");
            let last = self.last.read().await;
            return last.result.clone().unwrap_or_else(CrawlSummary::empty);
        }

        info!(agents = agents.len(), "starting discovery sweep");
        self.index.write().await.clear();

        let queries = agents.iter().map(|agent| async move {
            let agent_url = normalize_agent_url(&agent.url);
            match self.query_agent(agent, &agent_url).await {
                Ok(properties) => {
                    let count = properties.len();
                    self.index
                        .write()
                        .await
                        .replace_agent_properties(&agent_url, properties);
                    debug!(%agent_url, properties = count, "installed agent claims");
                    AgentOutcome::Installed { properties: count }
                }
                Err(error) => {
                    warn!(%agent_url, %error, "agent query failed");
                    AgentOutcome::Failed(AgentFailure { agent_url, error })
                }
            }
        });
        let outcomes = join_all(queries).await;

        let mut summary = CrawlSummary::empty();
        for outcome in outcomes {
            match outcome {
                AgentOutcome::Installed { properties } => {
                    summary.successful_agents += 1;
                    summary.total_properties += properties;
                }
                AgentOutcome::Failed(failure) => {
                    summary.failed_agents += 1;
                    summary.failures.push(failure);
                }
            }
        }
        summary.completed_at = Utc::now();

        info!(
            total_properties = summary.total_properties,
            successful = summary.successful_agents,
            failed = summary.failed_agents,
            "discovery sweep complete"
        );

        {
            let mut last = self.last.write().await;
            last.at = Some(summary.completed_at);
            last.result = Some(summary.clone());
        }
        self.crawling.store(false, Ordering::Release);
        summary
    }

    async fn query_agent(
        &self,
        agent: &AgentDescriptor,
        agent_url: &str,
    ) -> Result<Vec<crate::property_index::Property>, String> {
        let outcome = self
            .client
            .invoke(
                agent_url,
                agent.protocol.as_deref(),
                self.config.properties_operation(),
                json!({}),
            )
            .await;

        if !outcome.success {
            return Err(outcome
                .error
                .unwrap_or_else(|| "agent reported failure without detail".to_string()));
        }
        let data = outcome
            .data
            .ok_or_else(|| "agent returned success without data".to_string())?;
        properties_from_response(data).map_err(|e| e.to_string())
    }

    /// Run one sweep now, then re-run on the configured interval until
    /// [`stop_periodic_crawl`](Self::stop_periodic_crawl). A tick firing
    /// while a sweep is still running is absorbed by the single-flight
    /// guard. Starting again replaces any previous schedule.
    pub async fn start_periodic_crawl(self: &Arc<Self>, agents: Vec<AgentDescriptor>) {
        self.start_periodic_crawl_with_interval(agents, self.config.crawl_interval())
            .await;
    }

    pub async fn start_periodic_crawl_with_interval(
        self: &Arc<Self>,
        agents: Vec<AgentDescriptor>,
        interval: Duration,
    ) {
        let mut periodic = self.periodic.lock().await;
        if let Some(previous) = periodic.take() {
            // Signal instead of abort: aborting mid-sweep would leave the
            // single-flight flag set forever.
            let _ = previous.stop.send(true);
        }

        let (stop, mut stopped) = watch::channel(false);
        let crawler = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        crawler.crawl_all_agents(&agents).await;
                    }
                    _ = stopped.changed() => break,
                }
            }
        });

        info!(interval_secs = interval.as_secs(), "periodic crawl started");
        *periodic = Some(PeriodicTask { handle, stop });
    }

    /// Stop the periodic schedule. A sweep already in progress finishes;
    /// no further ticks fire.
    pub async fn stop_periodic_crawl(&self) {
        let mut periodic = self.periodic.lock().await;
        if let Some(task) = periodic.take() {
            let _ = task.stop.send(true);
            // Wait for the loop (and any sweep it is mid-way through) to wind down.
            let _ = task.handle.await;
            info!("periodic crawl stopped");
        }
    }

    /// Cheap read-only snapshot; no side effects.
    pub async fn status(&self) -> CrawlerStatus {
        let last = self.last.read().await;
        CrawlerStatus {
            crawling: self.crawling.load(Ordering::Acquire),
            last_crawl: last.at,
            last_result: last.result.clone(),
            index: self.index.read().await.stats(),
        }
    }
}
