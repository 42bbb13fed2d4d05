use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{AcquireError, Semaphore, SemaphorePermit};

/// Page budget shared by all workers
///
/// A worker holds a slot from poll until its task's outcome. Committing a page
/// consumes the slot for good; any other outcome returns it. The number of
/// committed pages therefore never exceeds the budget however many workers run.
#[derive(Debug)]
pub struct PageBudget {
    max_pages: usize,
    slots: Semaphore,
    committed: AtomicUsize,
}

impl PageBudget {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            slots: Semaphore::new(max_pages.min(Semaphore::MAX_PERMITS)),
            committed: AtomicUsize::new(0),
        }
    }

    /// Waits for a free slot
    ///
    /// Never completes once the budget is spent; callers select against
    /// cancellation.
    pub async fn reserve(&self) -> Result<SemaphorePermit<'_>, AcquireError> {
        self.slots.acquire().await
    }

    /// Consumes a slot, returning the number of pages committed so far
    pub fn commit(&self, slot: SemaphorePermit<'_>) -> usize {
        slot.forget();
        self.committed.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn committed(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn is_exhausted(&self) -> bool {
        self.committed() >= self.max_pages
    }
}
