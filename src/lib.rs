//! PuppetDB Browser Library
//!
//! Query and aggregation client layer for browsing a PuppetDB inventory:
//! builds array-form query ASTs, executes them over HTTP, normalizes nodes,
//! reports and facts into typed records, and derives dashboard statistics and
//! client-side search views from them.

pub mod config;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use services::puppetdb::PuppetDbClient;
pub use utils::error::{PuppetDbError, Result};
