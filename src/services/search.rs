//! Client-side search and status filtering
//!
//! Works on a batch that has already been fetched; nothing here talks to
//! PuppetDB. Text search is a case-insensitive substring match over a fixed
//! set of fields per record type.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::models::{Fact, Node, Report, Status};
use crate::utils::error::PuppetDbError;

/// Records that can be text-searched
pub trait Searchable {
    /// Fields the search term is matched against
    fn search_fields(&self) -> Vec<Cow<'_, str>>;
}

/// Records that carry a run status
pub trait HasStatus {
    fn status(&self) -> Option<Status>;
}

impl Searchable for Node {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.certname.as_str())];
        if let Some(ref env) = self.catalog_environment {
            fields.push(Cow::Borrowed(env.as_str()));
        }
        fields
    }
}

impl HasStatus for Node {
    fn status(&self) -> Option<Status> {
        self.latest_report_status
    }
}

impl Searchable for Report {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        let mut fields = vec![Cow::Borrowed(self.certname.as_str())];
        if let Some(ref env) = self.environment {
            fields.push(Cow::Borrowed(env.as_str()));
        }
        fields
    }
}

impl HasStatus for Report {
    fn status(&self) -> Option<Status> {
        self.status
    }
}

impl Searchable for Fact {
    fn search_fields(&self) -> Vec<Cow<'_, str>> {
        // Serialized form, so strings match with their quotes and structures
        // match on any key or nested value
        vec![
            Cow::Borrowed(self.certname.as_str()),
            Cow::Owned(self.value.to_string()),
        ]
    }
}

/// Does any search field contain `term`, ignoring case
pub fn matches_term<T: Searchable>(record: &T, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    record
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Keep records matching `term`; an empty term keeps everything
pub fn filter_text<T: Searchable + Clone>(batch: &[T], term: &str) -> Vec<T> {
    batch
        .iter()
        .filter(|record| matches_term(*record, term))
        .cloned()
        .collect()
}

/// Status selector; `All` is a pass-through and never sent to PuppetDB
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl StatusFilter {
    pub fn accepts(&self, status: Option<Status>) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status == Some(*wanted),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = PuppetDbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse::<Status>()
            .map(StatusFilter::Only)
            .map_err(PuppetDbError::ValidationError)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

/// Keep records whose status matches
pub fn filter_status<T: HasStatus + Clone>(batch: &[T], status: StatusFilter) -> Vec<T> {
    batch
        .iter()
        .filter(|record| status.accepts(record.status()))
        .cloned()
        .collect()
}

/// Combined text and status filter, as used by the node and report views
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub term: String,
    pub status: StatusFilter,
}

impl SearchFilter {
    pub fn new(term: impl Into<String>, status: StatusFilter) -> Self {
        Self {
            term: term.into(),
            status,
        }
    }

    /// Apply both filters to the full batch
    pub fn apply<T: Searchable + HasStatus + Clone>(&self, batch: &[T]) -> Vec<T> {
        batch
            .iter()
            .filter(|record| self.status.accepts(record.status()))
            .filter(|record| matches_term(*record, &self.term))
            .cloned()
            .collect()
    }
}
