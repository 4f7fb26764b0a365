//! Utility modules

pub mod error;

pub use error::{PuppetDbError, Result};
