//! Async orchestration around the pure valuation engine: cached dataset loads
//! and batched ranking runs guarded by the cache's generation tokens.

pub mod loader;
pub mod service;

pub use crate::cache::{GenerationToken, Generations};
pub use loader::{DatasetLoader, LoadError, Resource};
pub use service::{OrchestrationError, ServiceSettings, ValuationService};
