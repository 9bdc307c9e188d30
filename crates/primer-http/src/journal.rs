//! Bounded logs of served exchanges and unmatched requests.

use crate::model::{Request, Response};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A served request and the response it received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exchange {
    pub request: Request,
    pub response: Response,
    pub served_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(request: Request, response: Response) -> Self {
        Self {
            request,
            response,
            served_at: Utc::now(),
        }
    }
}

/// Fixed-capacity FIFO log that evicts its oldest entry when full.
///
/// Safe to share between threads; every operation takes the internal lock
/// once, so concurrent writers never lose entries or exceed the capacity.
/// A capacity of zero records nothing.
#[derive(Debug)]
pub struct BoundedLog<T> {
    capacity: usize,
    entries: Mutex<VecDeque<T>>,
}

impl<T: Clone> BoundedLog<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append, evicting the oldest entries beyond capacity.
    pub fn add(&self, item: T) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        entries.push_back(item);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Entries from oldest to newest.
    pub fn values(&self) -> Vec<T> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Number of entries satisfying `predicate`.
    pub fn count<F>(&self, predicate: F) -> usize
    where
        F: Fn(&T) -> bool,
    {
        self.entries.lock().iter().filter(|item| predicate(item)).count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_evicts_oldest_first() {
        let log = BoundedLog::new(2);
        assert_eq!(log.capacity(), 2);
        log.add("a");
        log.add("b");
        log.add("c");
        assert_eq!(log.values(), vec!["b", "c"]);
    }

    #[test]
    fn test_zero_capacity_records_nothing() {
        let log = BoundedLog::new(0);
        log.add(1);
        assert!(log.is_empty());
    }

    #[test]
    fn test_count_and_clear() {
        let log = BoundedLog::new(10);
        for i in 0..6 {
            log.add(i);
        }
        assert_eq!(log.count(|n| n % 2 == 0), 3);
        log.clear();
        assert_eq!(log.len(), 0);
        assert_eq!(log.count(|_| true), 0);
    }

    #[test]
    fn test_concurrent_writers_respect_capacity() {
        let log = Arc::new(BoundedLog::new(50));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..100 {
                        log.add((t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let values = log.values();
        assert_eq!(values.len(), 50);
        // Per-writer order survives eviction
        for t in 0..8 {
            let seen: Vec<_> = values.iter().filter(|(w, _)| *w == t).map(|(_, i)| *i).collect();
            assert!(seen.windows(2).all(|w| w[0] < w[1]));
        }
    }

    #[test]
    fn test_concurrent_writers_lose_nothing_under_capacity() {
        let log = Arc::new(BoundedLog::new(1000));
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for i in 0..100 {
                        log.add(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.len(), 400);
    }
}
