//! Shortener - URL shortener core with asynchronous soft deletion
//!
//! # Architecture
//! - `storage`: `Storage` trait and the memory / file / database backends
//! - `deletion`: producer → fan-in → aggregator pipeline flushing batched
//!   soft deletes into a `DeletionSink`
//! - `services`: shortening and retrieval on top of a `Storage`
//! - `errors`: error type shared by every layer
//! - `config`: TOML + environment configuration
//! - `interfaces`: management CLI
//! - `system`: logging and lifecycle

pub mod cli;
pub mod config;
pub mod deletion;
pub mod errors;
pub mod interfaces;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
