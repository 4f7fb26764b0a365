//! PuppetDB client service
//!
//! One method per collection (nodes, reports, facts, fact names,
//! environments, metrics). Each composes the query AST builder with a
//! [`Transport`] and narrows the untyped JSON into the crate's models.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::PuppetDbConfig;
use crate::models::{Fact, NameEntry, Node, NodeFacts, Report};
use crate::services::query::{equals, matches, Query, QueryBuilder};
use crate::services::transport::{ApiRoot, HttpTransport, OrderBy, QueryParams, Transport};
use crate::utils::error::{PuppetDbError, Result};

/// Canonical ordering key of reports
pub const PRODUCER_TIMESTAMP: &str = "producer_timestamp";

/// Result window for recency-sensitive fetches.
///
/// The ordering is part of the type: a page cannot be built without one, so
/// "most recent" listings never fall back to the service's undefined order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub order_by: OrderBy,
}

impl Page {
    pub fn new(limit: u32, order_by: OrderBy) -> Self {
        Self { limit, order_by }
    }

    /// Newest first by producer timestamp
    pub fn most_recent(limit: u32) -> Self {
        Self::new(limit, OrderBy::desc(PRODUCER_TIMESTAMP))
    }

    fn to_params(&self) -> QueryParams {
        QueryParams::new()
            .limit(self.limit)
            .order_by(std::slice::from_ref(&self.order_by))
    }
}

/// PuppetDB API client
pub struct PuppetDbClient<T = HttpTransport> {
    transport: Arc<T>,
}

impl<T> Clone for PuppetDbClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl PuppetDbClient<HttpTransport> {
    /// Create a client talking HTTP to the configured PuppetDB
    pub fn from_config(config: &PuppetDbConfig) -> anyhow::Result<Self> {
        let transport = HttpTransport::new(config)?;
        info!(
            "PuppetDB client initialized successfully for {}",
            transport.base_url()
        );
        Ok(Self::new(transport))
    }
}

impl<T: Transport> PuppetDbClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ==================== Node Endpoints ====================

    /// Get all nodes, in service-default order
    pub async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.fetch(ApiRoot::Query, "nodes", &QueryParams::new()).await
    }

    /// Get nodes matching a query
    pub async fn query_nodes(&self, query: &QueryBuilder) -> Result<Vec<Node>> {
        self.fetch(ApiRoot::Query, "nodes", &filtered(query.build()))
            .await
    }

    /// Get a specific node by certname
    pub async fn get_node(&self, certname: &str) -> Result<Node> {
        let nodes: Vec<Node> = self
            .fetch(
                ApiRoot::Query,
                "nodes",
                &filtered(Some(equals("certname", certname))),
            )
            .await?;

        first_or_not_found(nodes, || format!("Node {} not found", certname))
    }

    // ==================== Report Endpoints ====================

    /// Most recent reports across all nodes, newest first
    pub async fn list_reports(&self, limit: u32) -> Result<Vec<Report>> {
        self.fetch_page("reports", None, &Page::most_recent(limit))
            .await
    }

    /// Most recent reports of one node, newest first
    pub async fn list_node_reports(&self, certname: &str, limit: u32) -> Result<Vec<Report>> {
        self.fetch_page(
            "reports",
            Some(equals("certname", certname)),
            &Page::most_recent(limit),
        )
        .await
    }

    /// Get a specific report by hash
    pub async fn get_report(&self, hash: &str) -> Result<Report> {
        let reports: Vec<Report> = self
            .fetch(ApiRoot::Query, "reports", &filtered(Some(equals("hash", hash))))
            .await?;

        first_or_not_found(reports, || format!("Report {} not found", hash))
    }

    // ==================== Fact Endpoints ====================

    /// Facts of one node, or of the whole fleet when no certname is given.
    ///
    /// The unfiltered form dumps every fact PuppetDB holds.
    pub async fn list_facts(&self, certname: Option<&str>) -> Result<Vec<Fact>> {
        let query = certname.map(|c| equals("certname", c));
        self.fetch(ApiRoot::Query, "facts", &filtered(query)).await
    }

    /// All facts of a node folded into one record.
    ///
    /// The node lookup runs first and must succeed: it supplies the facts
    /// environment and timestamp, and a missing node is `NotFound` whether or
    /// not facts exist for it.
    pub async fn get_node_facts(&self, certname: &str) -> Result<NodeFacts> {
        let nodes: Vec<Node> = self
            .fetch(
                ApiRoot::Query,
                "nodes",
                &filtered(Some(equals("certname", certname))),
            )
            .await?;
        let node = first_or_not_found(nodes, || format!("Facts for node {} not found", certname))?;

        let facts = self.list_facts(Some(certname)).await?;
        debug!("Joined {} facts for node {}", facts.len(), certname);

        let values: BTreeMap<String, Value> = facts
            .into_iter()
            .map(|fact| (fact.name, fact.value))
            .collect();

        Ok(NodeFacts {
            certname: certname.to_string(),
            environment: node.facts_environment,
            values,
            timestamp: node.facts_timestamp,
            producer_timestamp: node.facts_timestamp,
            producer: certname.to_string(),
        })
    }

    /// Get all unique fact names
    pub async fn list_fact_names(&self) -> Result<Vec<String>> {
        self.fetch_names("fact-names").await
    }

    /// Facts with the given name, optionally restricted to values matching a regex
    pub async fn search_facts(&self, name: &str, value_pattern: Option<&str>) -> Result<Vec<Fact>> {
        let query = match value_pattern.filter(|p| !p.is_empty()) {
            Some(pattern) => Query::And(vec![equals("name", name), matches("value", pattern)]),
            None => equals("name", name),
        };
        self.fetch(ApiRoot::Query, "facts", &filtered(Some(query)))
            .await
    }

    // ==================== Raw Queries ====================

    /// Run caller-supplied AST text against the nodes endpoint.
    ///
    /// The text is sent as the `query` parameter unmodified; any syntax error
    /// is reported by PuppetDB.
    pub async fn execute_raw_query(&self, ast_text: &str) -> Result<Value> {
        debug!("Executing raw query: {}", ast_text);
        self.transport
            .execute(ApiRoot::Query, "nodes", &QueryParams::new().query(ast_text))
            .await
    }

    // ==================== Environment Endpoints ====================

    /// Get all environment names
    pub async fn list_environments(&self) -> Result<Vec<String>> {
        self.fetch_names("environments").await
    }

    // ==================== Server Status Endpoints ====================

    /// Operational metrics, keyed by mbean name
    pub async fn get_metrics(&self) -> Result<Map<String, Value>> {
        self.fetch(ApiRoot::Metrics, "mbeans", &QueryParams::new())
            .await
    }

    // ==================== Helper Methods ====================

    async fn fetch<R: DeserializeOwned>(
        &self,
        root: ApiRoot,
        path: &str,
        params: &QueryParams,
    ) -> Result<R> {
        let value = self.transport.execute(root, path, params).await?;
        serde_json::from_value(value).map_err(|e| {
            PuppetDbError::Decode(format!("Unexpected shape in /{} response: {}", path, e))
        })
    }

    async fn fetch_page<R: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<Query>,
        page: &Page,
    ) -> Result<Vec<R>> {
        let mut params = page.to_params();
        params.query = query.map(|q| q.to_json());
        self.fetch(ApiRoot::Query, path, &params).await
    }

    async fn fetch_names(&self, path: &str) -> Result<Vec<String>> {
        let entries: Vec<NameEntry> = self.fetch(ApiRoot::Query, path, &QueryParams::new()).await?;
        Ok(entries.into_iter().map(NameEntry::into_name).collect())
    }
}

/// Parameters carrying an optional filter; no filter means no `query` parameter
fn filtered(query: Option<Query>) -> QueryParams {
    QueryParams {
        query: query.map(|q| q.to_json()),
        ..Default::default()
    }
}

fn first_or_not_found<R>(items: Vec<R>, message: impl FnOnce() -> String) -> Result<R> {
    items
        .into_iter()
        .next()
        .ok_or_else(|| PuppetDbError::NotFound(message()))
}
