//! Report data model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Status;

/// Represents a Puppet run report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Report hash (unique identifier)
    pub hash: String,

    /// Certificate name of the node
    pub certname: String,

    /// Environment
    #[serde(default)]
    pub environment: Option<String>,

    /// Status of the report
    #[serde(default)]
    pub status: Option<Status>,

    /// Whether this is a noop run
    #[serde(default)]
    pub noop: Option<bool>,

    /// Whether noop was pending
    #[serde(default)]
    pub noop_pending: Option<bool>,

    /// Puppet version
    #[serde(default)]
    pub puppet_version: Option<String>,

    /// Report format version
    #[serde(default)]
    pub report_format: Option<u32>,

    /// Configuration version
    #[serde(default)]
    pub configuration_version: Option<String>,

    /// Start time of the Puppet run
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,

    /// End time of the Puppet run
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,

    /// Producer timestamp, the canonical ordering key
    #[serde(default)]
    pub producer_timestamp: Option<DateTime<Utc>>,

    /// Producer (Puppet server)
    #[serde(default)]
    pub producer: Option<String>,

    /// Transaction UUID
    #[serde(default)]
    pub transaction_uuid: Option<String>,

    /// Catalog UUID
    #[serde(default)]
    pub catalog_uuid: Option<String>,

    /// Code ID
    #[serde(default)]
    pub code_id: Option<String>,

    /// Cached catalog status
    #[serde(default)]
    pub cached_catalog_status: Option<String>,

    /// Resources touched by the run
    #[serde(default)]
    pub resources: Option<Vec<ReportResource>>,

    /// Log lines emitted by the run
    #[serde(default)]
    pub logs: Option<Expandable<ReportLog>>,

    /// Report metrics (raw PuppetDB format)
    #[serde(default)]
    pub metrics: Option<serde_json::Value>,
}

impl Report {
    /// Wall-clock duration of the run, `end_time - start_time`
    pub fn duration(&self) -> Option<Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Log lines carried inline by the report (empty when only an href was returned)
    pub fn log_entries(&self) -> &[ReportLog] {
        self.logs.as_ref().map(Expandable::items).unwrap_or(&[])
    }
}

/// A nested collection that PuppetDB returns either inline or as `{data, href}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Inline(Vec<T>),
    Reference {
        /// Null, an array, or missing entirely in PuppetDB responses
        data: Option<Vec<T>>,
        href: Option<String>,
    },
}

impl<T> Expandable<T> {
    pub fn items(&self) -> &[T] {
        match self {
            Expandable::Inline(items) => items,
            Expandable::Reference { data, .. } => data.as_deref().unwrap_or(&[]),
        }
    }

    pub fn href(&self) -> Option<&str> {
        match self {
            Expandable::Inline(_) => None,
            Expandable::Reference { href, .. } => href.as_deref(),
        }
    }
}

/// Resource managed during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportResource {
    pub resource_type: String,
    pub resource_title: String,
    #[serde(default)]
    pub containment_path: Vec<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Events in the order they happened
    #[serde(default)]
    pub events: Vec<ResourceEvent>,
}

/// Event recorded against a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceEvent {
    pub status: EventStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub new_value: Option<serde_json::Value>,
    #[serde(default)]
    pub old_value: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Event status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failure,
    Noop,
    Skipped,
    #[serde(other)]
    Unknown,
}

/// Log line from a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportLog {
    pub level: String,
    pub message: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}
