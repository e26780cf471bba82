//! Bounded lock-free queue split into a single producer and a single consumer.
//!
//! Both halves are `Send` but not `Clone`, and every operation takes `&mut self`,
//! so each side can only be driven from one thread at a time. When the queue is
//! full, a push overwrites the oldest unread item.

use crossbeam::queue::ArrayQueue;
use std::sync::Arc;

pub const DEFAULT_CAPACITY: usize = 30;

pub fn channel<T: Send>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    let queue = Arc::new(ArrayQueue::new(capacity.max(1)));

    (
        Producer {
            queue: Arc::clone(&queue),
        },
        Consumer { queue },
    )
}

pub struct Producer<T> {
    queue: Arc<ArrayQueue<T>>,
}

impl<T> Producer<T> {
    /// Enqueue `item`. Returns the oldest unread item if it had to be displaced.
    pub fn push(&mut self, item: T) -> Option<T> {
        self.queue.force_push(item)
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

pub struct Consumer<T> {
    queue: Arc<ArrayQueue<T>>,
}

impl<T> Consumer<T> {
    /// Dequeue one item without blocking.
    pub fn pull(&mut self) -> Option<T> {
        self.queue.pop()
    }

    /// Pull until empty and return the last item, dropping the older ones.
    pub fn drain_latest(&mut self) -> Option<T> {
        let mut latest = None;
        while let Some(item) = self.queue.pop() {
            latest = Some(item);
        }
        latest
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn pull_returns_items_in_push_order() {
        let (mut tx, mut rx) = channel(8);

        assert!(rx.pull().is_none());

        for i in 0..5 {
            assert!(tx.push(i).is_none());
        }
        assert_eq!(rx.len(), 5);

        for i in 0..5 {
            assert_eq!(rx.pull(), Some(i));
        }
        assert!(rx.pull().is_none());
        assert!(rx.is_empty());
    }

    #[test]
    fn full_queue_displaces_oldest() {
        let (mut tx, mut rx) = channel(2);

        assert!(tx.push(1).is_none());
        assert!(tx.push(2).is_none());
        assert_eq!(tx.push(3), Some(1));

        assert_eq!(rx.pull(), Some(2));
        assert_eq!(rx.pull(), Some(3));
        assert!(rx.pull().is_none());
    }

    #[test]
    fn drain_latest_keeps_last_item() {
        let (mut tx, mut rx) = channel(4);

        assert!(rx.drain_latest().is_none());

        tx.push("a");
        tx.push("b");
        assert_eq!(rx.drain_latest(), Some("b"));
        assert!(rx.is_empty());
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let (mut tx, mut rx) = channel(0);
        assert_eq!(tx.capacity(), 1);

        tx.push(7);
        assert_eq!(tx.push(8), Some(7));
        assert_eq!(rx.pull(), Some(8));
    }

    #[test]
    fn concurrent_consumer_sees_each_value_at_most_once_in_order() {
        const COUNT: u32 = 10_000;
        let (mut tx, mut rx) = channel(16);

        let producer = thread::spawn(move || {
            for i in 0..COUNT {
                tx.push(i);
            }
        });

        let mut seen = Vec::new();
        let mut last = None;
        loop {
            if let Some(v) = rx.pull() {
                seen.push(v);
                last = Some(v);
                if v == COUNT - 1 {
                    break;
                }
            } else if producer.is_finished() && rx.is_empty() {
                break;
            }
        }
        producer.join().unwrap();

        // Drops are allowed when the consumer falls behind, reordering is not.
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(last, Some(COUNT - 1));
    }
}
