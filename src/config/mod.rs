mod r#impl;
mod structs;
pub mod types;

pub use r#impl::{get_config, init_config};
pub use structs::*;
pub use types::{ShutdownPolicy, StorageBackendType};
