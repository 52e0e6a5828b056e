//! Application lifecycle: wiring on startup, ordered teardown on shutdown

pub mod shutdown;
pub mod startup;

pub use shutdown::{listen_for_shutdown, shutdown_gracefully};
pub use startup::{StartupContext, prepare_startup};
