//! Query client services

pub mod adhoc;
pub mod aggregator;
pub mod puppetdb;
pub mod query;
pub mod search;
pub mod transport;

pub use adhoc::{AdhocQueryRunner, AdhocResult, ExampleQuery, EXAMPLE_QUERIES};
pub use aggregator::{load_dashboard, most_recent, node_stats, DashboardSummary, NodeStats};
pub use puppetdb::{Page, PuppetDbClient, PRODUCER_TIMESTAMP};
pub use query::{Comparison, Query, QueryBuilder};
pub use search::{filter_status, filter_text, HasStatus, SearchFilter, Searchable, StatusFilter};
pub use transport::{ApiRoot, HttpTransport, OrderBy, QueryParams, SortOrder, Transport};
