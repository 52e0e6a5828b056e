//! Link management commands

mod delete;
mod query;
mod shorten;

pub use delete::*;
pub use query::*;
pub use shorten::*;
