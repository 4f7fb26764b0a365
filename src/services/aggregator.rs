//! Dashboard aggregation
//!
//! Summary statistics over already-fetched node and report batches. Nothing
//! here re-sorts: "most recent" slices keep the order PuppetDB returned.

use serde::Serialize;
use tracing::debug;

use crate::models::{Node, Report, Status};
use crate::services::puppetdb::PuppetDbClient;
use crate::services::transport::Transport;
use crate::utils::error::Result;

/// Reports fetched for the dashboard
pub const DASHBOARD_REPORT_LIMIT: u32 = 10;

/// Rows shown in each "recent" list
pub const DASHBOARD_RECENT_ROWS: usize = 5;

/// Counts over a node batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total: usize,
    /// Neither deactivated nor expired
    pub active: usize,
    pub failed: usize,
    pub unchanged: usize,
    pub changed: usize,
    /// No status, or one this client does not recognize
    pub unknown: usize,
    /// Size of the report batch handed in
    pub recent_reports: usize,
}

impl NodeStats {
    /// Deactivated or expired nodes
    pub fn inactive(&self) -> usize {
        self.total - self.active
    }
}

/// Compute node statistics; `report_count` is taken as given
pub fn node_stats(nodes: &[Node], report_count: usize) -> NodeStats {
    let mut stats = NodeStats {
        total: nodes.len(),
        recent_reports: report_count,
        ..Default::default()
    };

    for node in nodes {
        if node.is_active() {
            stats.active += 1;
        }
        match node.latest_report_status {
            Some(Status::Failed) => stats.failed += 1,
            Some(Status::Unchanged) => stats.unchanged += 1,
            Some(Status::Changed) => stats.changed += 1,
            Some(Status::Unknown) | None => stats.unknown += 1,
        }
    }

    stats
}

/// The first `n` records, in the order they were returned
pub fn most_recent<T: Clone>(batch: &[T], n: usize) -> Vec<T> {
    batch.iter().take(n).cloned().collect()
}

/// Everything the dashboard shows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub stats: NodeStats,
    pub recent_nodes: Vec<Node>,
    pub recent_reports: Vec<Report>,
}

impl DashboardSummary {
    pub fn from_batches(nodes: &[Node], reports: &[Report]) -> Self {
        Self {
            stats: node_stats(nodes, reports.len()),
            recent_nodes: most_recent(nodes, DASHBOARD_RECENT_ROWS),
            recent_reports: most_recent(reports, DASHBOARD_RECENT_ROWS),
        }
    }
}

/// Fetch nodes and recent reports concurrently and summarize them.
///
/// The two requests are independent; either may finish first. A failure of
/// either one fails the whole load.
pub async fn load_dashboard<T: Transport>(client: &PuppetDbClient<T>) -> Result<DashboardSummary> {
    let (nodes, reports) = futures::future::try_join(
        client.list_nodes(),
        client.list_reports(DASHBOARD_REPORT_LIMIT),
    )
    .await?;

    debug!(
        nodes = nodes.len(),
        reports = reports.len(),
        "Dashboard data loaded"
    );

    Ok(DashboardSummary::from_batches(&nodes, &reports))
}
