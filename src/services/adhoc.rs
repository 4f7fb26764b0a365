//! Ad-hoc query runner
//!
//! Executes a user-authored AST against the nodes endpoint. The only local
//! check is that the text is not blank; everything else, including syntax,
//! is judged by PuppetDB and its error text is handed back verbatim.

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::services::puppetdb::PuppetDbClient;
use crate::services::transport::Transport;
use crate::utils::error::{PuppetDbError, Result};

/// Raw query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdhocResult {
    /// Query results, array or single object
    pub results: Value,
    /// Number of results when `results` is an array
    pub count: Option<usize>,
}

impl AdhocResult {
    fn new(results: Value) -> Self {
        let count = results.as_array().map(Vec::len);
        Self { results, count }
    }
}

/// Ready-made query offered to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleQuery {
    pub title: &'static str,
    pub query: &'static str,
    pub description: &'static str,
}

/// Starter queries for the nodes endpoint
pub const EXAMPLE_QUERIES: &[ExampleQuery] = &[
    ExampleQuery {
        title: "All nodes",
        query: r#"["~", "certname", ".*"]"#,
        description: "Get all nodes in the infrastructure",
    },
    ExampleQuery {
        title: "Failed nodes",
        query: r#"["=", "latest_report_status", "failed"]"#,
        description: "Find nodes with failed status",
    },
    ExampleQuery {
        title: "Nodes in production",
        query: r#"["=", "catalog_environment", "production"]"#,
        description: "Get all nodes in production environment",
    },
    ExampleQuery {
        title: "Active nodes",
        query: r#"["and", ["null?", "deactivated", true], ["null?", "expired", true]]"#,
        description: "Find all active (not deactivated or expired) nodes",
    },
];

/// Runs raw AST text through a [`PuppetDbClient`]
pub struct AdhocQueryRunner<'a, T: Transport> {
    client: &'a PuppetDbClient<T>,
}

impl<'a, T: Transport> AdhocQueryRunner<'a, T> {
    pub fn new(client: &'a PuppetDbClient<T>) -> Self {
        Self { client }
    }

    /// Validate and execute `text`.
    ///
    /// Blank input fails with a validation error before any request is made.
    pub async fn run(&self, text: &str) -> Result<AdhocResult> {
        if text.trim().is_empty() {
            return Err(PuppetDbError::ValidationError(
                "Please enter a query".to_string(),
            ));
        }

        match self.client.execute_raw_query(text).await {
            Ok(results) => {
                let result = AdhocResult::new(results);
                info!(count = ?result.count, "Ad-hoc query executed");
                Ok(result)
            }
            Err(e) => {
                warn!("Ad-hoc query failed: {}", e.backend_message());
                Err(e)
            }
        }
    }
}
