//! Drop-oldest bounded queue between the playback controller and the viewer.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Default queue depth: always show the most recent frame.
pub const DEFAULT_CAPACITY: usize = 1;

/// A fixed-capacity FIFO that never blocks the producer.
///
/// When full, `put` discards the oldest item before inserting. `get` polls
/// and returns `None` when empty, so the consumer can keep servicing UI
/// events instead of blocking. Items are never reordered, only dropped.
#[derive(Debug)]
pub struct FrameQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> FrameQueue<T> {
    /// Creates a queue holding at most `capacity` items (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Enqueue `item`, returning the item evicted to make room, if any.
    pub fn put(&self, item: T) -> Option<T> {
        let mut items = self.items.lock();
        let evicted = if items.len() >= self.capacity {
            items.pop_front()
        } else {
            None
        };
        items.push_back(item);
        evicted
    }

    /// Oldest retained item, or `None` when empty.
    pub fn get(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T> Default for FrameQueue<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_single_slot_keeps_latest() {
        let queue = FrameQueue::new(1);
        assert_eq!(queue.put("a"), None);
        assert_eq!(queue.put("b"), Some("a"));

        assert_eq!(queue.get(), Some("b"));
        assert_eq!(queue.get(), None);
    }

    #[test]
    fn test_larger_capacity_is_fifo_among_retained() {
        let queue = FrameQueue::new(3);
        for i in 0..5 {
            queue.put(i);
        }

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.get(), Some(2));
        assert_eq!(queue.get(), Some(3));
        assert_eq!(queue.get(), Some(4));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_zero_capacity_is_promoted_to_one() {
        let queue: FrameQueue<u8> = FrameQueue::new(0);
        assert_eq!(queue.capacity(), 1);
    }

    #[test]
    fn test_concurrent_consumer_sees_increasing_items() {
        let queue = Arc::new(FrameQueue::new(1));
        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..10_000u32 {
                    queue.put(i);
                }
            })
        };

        let mut last = None;
        let mut seen = Vec::new();
        while !producer.is_finished() || !queue.is_empty() {
            if let Some(item) = queue.get() {
                seen.push(item);
                last = Some(item);
            }
        }
        producer.join().unwrap();

        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(last, Some(9_999));
    }
}
