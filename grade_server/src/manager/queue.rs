use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

/// Occupancy of the worker slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotStats {
    pub running: usize,
    pub waiting: usize,
    pub max: usize,
}

/// FIFO admission for grading workers.
pub struct Queue {
    max_concurrent: usize,
    running: usize,
    waiting: VecDeque<Arc<Notify>>,
}

impl Queue {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            running: 0,
            waiting: VecDeque::new(),
        }
    }

    /// Takes a slot if one is free. Otherwise returns a handle that is notified once a slot has
    /// been handed over to the caller.
    pub fn try_acquire_slot(&mut self) -> Option<Arc<Notify>> {
        if self.running < self.max_concurrent {
            self.running += 1;
            None
        } else {
            let notify = Arc::new(Notify::new());
            self.waiting.push_back(notify.clone());
            Some(notify)
        }
    }

    /// Frees a slot, passing it straight to the oldest waiter if there is one.
    pub fn release_slot(&mut self) {
        self.running = self.running.saturating_sub(1);

        if let Some(waiting_task) = self.waiting.pop_front() {
            self.running += 1;
            waiting_task.notify_one();
        }
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            running: self.running,
            waiting: self.waiting.len(),
            max: self.max_concurrent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_fill_then_queue() {
        let mut q = Queue::new(2);
        assert!(q.try_acquire_slot().is_none());
        assert!(q.try_acquire_slot().is_none());
        assert!(q.try_acquire_slot().is_some());
        assert_eq!(
            q.stats(),
            SlotStats {
                running: 2,
                waiting: 1,
                max: 2
            }
        );
    }

    #[tokio::test]
    async fn test_release_hands_slot_to_oldest_waiter() {
        let mut q = Queue::new(1);
        assert!(q.try_acquire_slot().is_none());
        let first = q.try_acquire_slot().unwrap();
        let second = q.try_acquire_slot().unwrap();

        q.release_slot();
        // Permit is stored, so this resolves immediately.
        first.notified().await;
        assert_eq!(q.stats().running, 1);
        assert_eq!(q.stats().waiting, 1);

        q.release_slot();
        second.notified().await;
        q.release_slot();
        assert_eq!(q.stats().running, 0);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut q = Queue::new(0);
        assert!(q.try_acquire_slot().is_none());
        assert_eq!(q.stats().max, 1);
    }
}
