// Copyright @yucwang 2026

use std::sync::atomic::{AtomicUsize, Ordering};

// Shared work queue drained by a fixed worker pool; a single fetch-add per
// item is the only synchronization.
pub struct WorkQueue<T> {
    items: Vec<T>,
    next: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, next: AtomicUsize::new(0) }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get_work(&self) -> Option<&T> {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        self.items.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::WorkQueue;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread;

    #[test]
    fn test_every_item_handed_out_once() {
        let queue = WorkQueue::new((0..1000u32).collect());
        let seen = Mutex::new(HashSet::new());

        thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    while let Some(&item) = queue.get_work() {
                        let fresh = seen.lock().unwrap().insert(item);
                        assert!(fresh);
                    }
                });
            }
        });

        assert_eq!(seen.lock().unwrap().len(), 1000);
    }
}
