//! Node data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Status;

/// Represents a node in the infrastructure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Certificate name (unique identifier)
    pub certname: String,

    /// When the node was deactivated
    #[serde(default)]
    pub deactivated: Option<DateTime<Utc>>,

    /// When the node expired
    #[serde(default)]
    pub expired: Option<DateTime<Utc>>,

    /// Timestamp of the most recent catalog
    #[serde(default)]
    pub catalog_timestamp: Option<DateTime<Utc>>,

    /// Timestamp of the most recent facts
    #[serde(default)]
    pub facts_timestamp: Option<DateTime<Utc>>,

    /// Timestamp of the most recent report
    #[serde(default)]
    pub report_timestamp: Option<DateTime<Utc>>,

    /// Environment the node's catalog was compiled in
    #[serde(default)]
    pub catalog_environment: Option<String>,

    /// Environment from facts
    #[serde(default)]
    pub facts_environment: Option<String>,

    /// Environment from report
    #[serde(default)]
    pub report_environment: Option<String>,

    /// Latest report status
    #[serde(default)]
    pub latest_report_status: Option<Status>,

    /// Whether the latest report was a noop run
    #[serde(default)]
    pub latest_report_noop: Option<bool>,

    /// Whether the latest report had pending noop events
    #[serde(default)]
    pub latest_report_noop_pending: Option<bool>,

    /// Hash of the latest report
    #[serde(default)]
    pub latest_report_hash: Option<String>,

    /// Whether the latest report has corrective changes
    #[serde(default)]
    pub latest_report_corrective_change: Option<bool>,

    /// Cached catalog status of the latest run
    #[serde(default)]
    pub cached_catalog_status: Option<String>,
}

impl Node {
    /// A node is active iff it is neither deactivated nor expired
    pub fn is_active(&self) -> bool {
        self.deactivated.is_none() && self.expired.is_none()
    }
}
