//! Data models

mod fact;
mod node;
mod report;
mod status;

pub use fact::*;
pub use node::*;
pub use report::*;
pub use status::*;
