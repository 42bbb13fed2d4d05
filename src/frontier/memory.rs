use crate::frontier::{CrawlTask, FrontierError, FrontierStore};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Binary-heap frontier store
#[derive(Debug, Default)]
pub struct MemoryFrontierStore {
    heap: BinaryHeap<Reverse<CrawlTask>>,
}

impl MemoryFrontierStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrontierStore for MemoryFrontierStore {
    fn push(&mut self, task: &CrawlTask) -> Result<(), FrontierError> {
        self.heap.push(Reverse(task.clone()));
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<CrawlTask>, FrontierError> {
        Ok(self.heap.pop().map(|Reverse(task)| task))
    }

    fn len(&self) -> Result<usize, FrontierError> {
        Ok(self.heap.len())
    }

    fn close(&mut self) -> Result<(), FrontierError> {
        self.heap.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(url: &str, depth: u32, sequence: u64) -> CrawlTask {
        CrawlTask {
            url: url.to_string(),
            depth,
            sequence,
        }
    }

    #[test]
    fn test_pops_lowest_depth_then_sequence() {
        let mut store = MemoryFrontierStore::new();
        store.push(&task("deep", 2, 0)).unwrap();
        store.push(&task("late", 0, 5)).unwrap();
        store.push(&task("early", 0, 1)).unwrap();

        assert_eq!(store.pop().unwrap().unwrap().url, "early");
        assert_eq!(store.pop().unwrap().unwrap().url, "late");
        assert_eq!(store.pop().unwrap().unwrap().url, "deep");
        assert!(store.pop().unwrap().is_none());
    }
}
