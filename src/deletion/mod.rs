//! User-scoped asynchronous soft deletion
//!
//! Callers hand over `(owner, codes)` and return immediately; the
//! [`DeletionPipeline`] merges all requests and flushes them in batches to a
//! [`DeletionSink`].

mod fanin;
pub mod pipeline;
pub mod sink;

pub use pipeline::{DeletionPipeline, PipelineOptions, PipelineState};
pub use sink::DeletionSink;
