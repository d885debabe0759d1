//! Scoped ownership of intermediate images.
//!
//! Every image the pipeline creates while searching is wrapped in a
//! [`Scratch`] guard. The guard counts itself as released when dropped, so
//! the ledger can prove that a detection call let go of everything it made,
//! whichever path it returned through.

use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    created: AtomicUsize,
    released: AtomicUsize,
}

/// Shared created/released counters for intermediate images.
#[derive(Debug, Clone, Default)]
pub struct ImageLedger {
    counters: Arc<Counters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub created: usize,
    pub released: usize,
}

impl LedgerSnapshot {
    pub fn outstanding(&self) -> usize {
        self.created.saturating_sub(self.released)
    }
}

impl ImageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly produced image.
    pub fn track<I>(&self, image: I) -> Scratch<I> {
        self.counters.created.fetch_add(1, Ordering::Relaxed);
        Scratch {
            image,
            counters: Arc::clone(&self.counters),
        }
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            created: self.counters.created.load(Ordering::Relaxed),
            released: self.counters.released.load(Ordering::Relaxed),
        }
    }
}

/// An intermediate image owned by the step that produced it.
#[derive(Debug)]
pub struct Scratch<I> {
    image: I,
    counters: Arc<Counters>,
}

impl<I> Deref for Scratch<I> {
    type Target = I;

    fn deref(&self) -> &I {
        &self.image
    }
}

impl<I> Drop for Scratch<I> {
    fn drop(&mut self) {
        self.counters.released.fetch_add(1, Ordering::Relaxed);
    }
}
