//! Generation counter guarding long-running computations against stale inputs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared counter; advancing it invalidates every token issued earlier.
#[derive(Debug, Clone, Default)]
pub struct Generations {
    current: Arc<AtomicU64>,
}

/// Snapshot of the generation a computation started under.
#[derive(Debug, Clone)]
pub struct GenerationToken {
    issued: u64,
    current: Option<Arc<AtomicU64>>,
}

impl Generations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Token bound to the current generation, without advancing it.
    pub fn token(&self) -> GenerationToken {
        GenerationToken {
            issued: self.current(),
            current: Some(self.current.clone()),
        }
    }

    /// Start a new generation and return its token.
    pub fn advance(&self) -> GenerationToken {
        let issued = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            issued,
            current: Some(self.current.clone()),
        }
    }
}

impl GenerationToken {
    /// A token that never goes stale.
    pub fn detached() -> Self {
        Self {
            issued: 0,
            current: None,
        }
    }

    pub fn generation(&self) -> u64 {
        self.issued
    }

    pub fn is_current(&self) -> bool {
        match &self.current {
            Some(current) => current.load(Ordering::SeqCst) == self.issued,
            None => true,
        }
    }
}
