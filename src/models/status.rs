//! Run status shared by nodes and reports

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Outcome of a configuration run, as reported by PuppetDB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Unchanged,
    Changed,
    Failed,
    /// Any status string this client does not recognize
    #[serde(other)]
    Unknown,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Unchanged => "unchanged",
            Status::Changed => "changed",
            Status::Failed => "failed",
            Status::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unchanged" => Ok(Status::Unchanged),
            "changed" => Ok(Status::Changed),
            "failed" => Ok(Status::Failed),
            other => Err(format!(
                "unknown status '{}', expected one of: unchanged, changed, failed",
                other
            )),
        }
    }
}
