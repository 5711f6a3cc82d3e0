//! Effect-activation epochs.
//!
//! DESIGN
//! ======
//! Every effect activation (a hook mounting, a resolver key changing) takes an
//! [`EpochToken`]. Async continuations check `is_current()` before touching
//! state; bumping the epoch on teardown or dependency change turns every
//! outstanding continuation into a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared generation counter owned by one hook or resolver instance.
#[derive(Clone, Debug, Default)]
pub struct Epoch {
    current: Arc<AtomicU64>,
}

/// Snapshot of an [`Epoch`] taken when an effect activation starts.
#[derive(Clone, Debug)]
pub struct EpochToken {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Epoch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the current generation without invalidating anything.
    #[must_use]
    pub fn token(&self) -> EpochToken {
        EpochToken { generation: self.current.load(Ordering::Acquire), current: self.current.clone() }
    }

    /// Start a new generation. Every previously issued token goes stale.
    pub fn advance(&self) -> EpochToken {
        let generation = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        EpochToken { generation, current: self.current.clone() }
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }
}

impl EpochToken {
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire) == self.generation
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[path = "epoch_test.rs"]
mod tests;
