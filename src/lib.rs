// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod classify;
pub mod collector;
pub mod config;
pub mod feeds;
pub mod images;
pub mod metrics;
pub mod normalize;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::collector::{NewsCollector, RunSummary};
