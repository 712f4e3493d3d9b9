//! Bounded event queue -- the hand-off between receiver and relay.
//!
//! [`EventQueue`] is a fixed-capacity ring buffer with one producer (the UDP
//! receiver) and one consumer (the relay task). `push` never blocks and
//! never overwrites an unconsumed event; `pop` suspends until an event is
//! available or the queue is closed.
//!
//! One slot is always kept free, so at most `capacity - 1` events are
//! buffered:
//!
//! ```text
//! head == tail                 -> empty
//! (head + 1) % capacity == tail -> full
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

use alertik_core::LogEvent;
use tokio::sync::Notify;

/// Fixed-capacity SPSC event queue
pub struct EventQueue {
    ring: Mutex<Ring>,
    /// wakes the consumer on push/close
    ready: Notify,
    capacity: usize,
}

struct Ring {
    slots: Vec<Option<LogEvent>>,
    /// next slot to write
    head: usize,
    /// next slot to read
    tail: usize,
    closed: bool,
}

impl Ring {
    fn is_full(&self) -> bool {
        (self.head + 1) % self.slots.len() == self.tail
    }

    fn len(&self) -> usize {
        (self.head + self.slots.len() - self.tail) % self.slots.len()
    }

    fn write(&mut self, event: LogEvent) {
        self.slots[self.head] = Some(event);
        self.head = (self.head + 1) % self.slots.len();
    }

    fn take(&mut self) -> Option<LogEvent> {
        if self.head == self.tail {
            return None;
        }
        let event = self.slots[self.tail].take();
        self.tail = (self.tail + 1) % self.slots.len();
        event
    }
}

impl EventQueue {
    /// Creates a queue with `capacity` slots (minimum 2).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            ring: Mutex::new(Ring {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
                closed: false,
            }),
            ready: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an event.
    ///
    /// Returns `false`, leaving the queue untouched, when the queue is full
    /// or closed.
    pub fn push(&self, event: LogEvent) -> bool {
        {
            let mut ring = self.lock();
            if ring.closed || ring.is_full() {
                return false;
            }
            ring.write(event);
        }
        self.ready.notify_one();
        true
    }

    /// Appends an event, evicting the oldest queued event when full.
    ///
    /// Returns the evicted event, if any. Events pushed after [`close`]
    /// are handed straight back.
    ///
    /// [`close`]: EventQueue::close
    pub fn push_evicting(&self, event: LogEvent) -> Option<LogEvent> {
        let evicted = {
            let mut ring = self.lock();
            if ring.closed {
                return Some(event);
            }
            let evicted = if ring.is_full() { ring.take() } else { None };
            ring.write(event);
            evicted
        };
        self.ready.notify_one();
        evicted
    }

    /// Removes and returns the oldest event, waiting while the queue is
    /// empty.
    ///
    /// After [`close`](EventQueue::close) the remaining events are still
    /// returned; `None` means closed and drained.
    pub async fn pop(&self) -> Option<LogEvent> {
        loop {
            let notified = self.ready.notified();
            {
                let mut ring = self.lock();
                if let Some(event) = ring.take() {
                    return Some(event);
                }
                if ring.closed {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Non-blocking pop.
    pub fn try_pop(&self) -> Option<LogEvent> {
        self.lock().take()
    }

    /// Closes the queue and wakes the consumer.
    pub fn close(&self) {
        self.lock().closed = true;
        self.ready.notify_one();
    }

    /// Whether [`close`](EventQueue::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of buffered events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no events are buffered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots (usable capacity is one less).
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Fill ratio of the usable slots in 0.0~1.0.
    pub fn utilization(&self) -> f64 {
        let usable = self.capacity - 1;
        f64::from(u32::try_from(self.len()).unwrap_or(u32::MAX))
            / f64::from(u32::try_from(usable).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn event(text: &str) -> LogEvent {
        LogEvent::new(text, SystemTime::now())
    }

    #[test]
    fn push_pop_fifo() {
        let queue = EventQueue::new(8);
        for i in 0..5 {
            assert!(queue.push(event(&format!("line{i}"))));
        }
        assert_eq!(queue.len(), 5);

        for i in 0..5 {
            assert_eq!(queue.try_pop().unwrap().text, format!("line{i}"));
        }
        assert!(queue.is_empty());
        assert!(queue.try_pop().is_none());
    }

    #[test]
    fn holds_capacity_minus_one() {
        let queue = EventQueue::new(4);
        assert!(queue.push(event("a")));
        assert!(queue.push(event("b")));
        assert!(queue.push(event("c")));

        // full: the fourth push is rejected and nothing is overwritten
        assert!(!queue.push(event("d")));
        assert_eq!(queue.len(), 3);
        assert_eq!(queue.try_pop().unwrap().text, "a");

        // one slot freed
        assert!(queue.push(event("d")));
        let rest: Vec<_> = std::iter::from_fn(|| queue.try_pop())
            .map(|e| e.text)
            .collect();
        assert_eq!(rest, ["b", "c", "d"]);
    }

    #[test]
    fn push_evicting_drops_oldest() {
        let queue = EventQueue::new(3);
        assert!(queue.push_evicting(event("a")).is_none());
        assert!(queue.push_evicting(event("b")).is_none());

        let evicted = queue.push_evicting(event("c")).unwrap();
        assert_eq!(evicted.text, "a");
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.try_pop().unwrap().text, "b");
        assert_eq!(queue.try_pop().unwrap().text, "c");
    }

    #[test]
    fn wraps_around() {
        let queue = EventQueue::new(3);
        for round in 0..10 {
            assert!(queue.push(event(&format!("x{round}"))));
            assert!(queue.push(event(&format!("y{round}"))));
            assert_eq!(queue.try_pop().unwrap().text, format!("x{round}"));
            assert_eq!(queue.try_pop().unwrap().text, format!("y{round}"));
        }
    }

    #[test]
    fn minimum_capacity_is_two() {
        let queue = EventQueue::new(0);
        assert_eq!(queue.capacity(), 2);
        assert!(queue.push(event("only")));
        assert!(!queue.push(event("full")));
    }

    #[test]
    fn utilization_calculation() {
        let queue = EventQueue::new(11);
        assert_eq!(queue.utilization(), 0.0);
        for i in 0..5 {
            queue.push(event(&i.to_string()));
        }
        let util = queue.utilization();
        assert!(util > 0.49 && util < 0.51);
    }

    #[test]
    fn push_after_close_is_rejected() {
        let queue = EventQueue::new(4);
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.push(event("late")));
        assert_eq!(queue.push_evicting(event("late")).unwrap().text, "late");
    }

    #[tokio::test]
    async fn pop_waits_for_push() {
        let queue = Arc::new(EventQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!consumer.is_finished());

        assert!(queue.push(event("wake up")));
        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .expect("task should not panic");
        assert_eq!(popped.unwrap().text, "wake up");
    }

    #[tokio::test]
    async fn pop_drains_then_ends_after_close() {
        let queue = EventQueue::new(4);
        queue.push(event("a"));
        queue.push(event("b"));
        queue.close();

        assert_eq!(queue.pop().await.unwrap().text, "a");
        assert_eq!(queue.pop().await.unwrap().text, "b");
        assert!(queue.pop().await.is_none());
    }

    #[tokio::test]
    async fn close_wakes_waiting_consumer() {
        let queue = Arc::new(EventQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.close();

        let popped = tokio::time::timeout(Duration::from_secs(1), consumer)
            .await
            .expect("consumer should wake")
            .expect("task should not panic");
        assert!(popped.is_none());
    }

    #[tokio::test]
    async fn producer_consumer_preserve_order() {
        let queue = Arc::new(EventQueue::new(8));
        let producer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                for i in 0..200 {
                    while !queue.push(event(&i.to_string())) {
                        tokio::task::yield_now().await;
                    }
                }
                queue.close();
            })
        };

        let mut seen = Vec::new();
        while let Some(ev) = queue.pop().await {
            seen.push(ev.text.parse::<u32>().unwrap());
        }
        producer.await.unwrap();

        assert_eq!(seen, (0..200).collect::<Vec<_>>());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn len_never_exceeds_usable_capacity(
                capacity in 2usize..32,
                ops in proptest::collection::vec(any::<bool>(), 0..200),
            ) {
                let queue = EventQueue::new(capacity);
                let mut model = std::collections::VecDeque::new();
                let mut next = 0u32;

                for push in ops {
                    if push {
                        let accepted = queue.push(event(&next.to_string()));
                        prop_assert_eq!(accepted, model.len() < capacity - 1);
                        if accepted {
                            model.push_back(next);
                        }
                        next += 1;
                    } else {
                        let popped = queue.try_pop().map(|e| e.text.parse::<u32>().unwrap());
                        prop_assert_eq!(popped, model.pop_front());
                    }
                    prop_assert!(queue.len() < capacity);
                    prop_assert_eq!(queue.len(), model.len());
                }
            }
        }
    }
}
