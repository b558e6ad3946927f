//! Cancellable scheduled tasks.
//!
//! The engine never sleeps or spawns; the host advances time by calling
//! `tick(now_ms)` and every task whose deadline has passed is returned for the
//! owner to act on. Cancelling a task that already fired is a no-op.

use std::collections::BTreeMap;

/// Handle to a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// A queue of tasks ordered by deadline.
#[derive(Debug)]
pub struct TimerQueue<T> {
    /// Keyed by `(deadline, id)` so ties fire in scheduling order.
    entries: BTreeMap<(u64, TimerId), T>,
    next_id: u64,
}

impl<T> TimerQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 0,
        }
    }

    /// Schedule `task` to fire once `now >= deadline_ms`.
    pub fn schedule(&mut self, deadline_ms: u64, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert((deadline_ms, id), task);
        id
    }

    /// Cancel a scheduled task, returning it if it had not fired yet.
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let key = self.entries.keys().find(|(_, tid)| *tid == id).copied()?;
        self.entries.remove(&key)
    }

    /// Remove and return every task due at `now_ms`, earliest first.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<T> {
        let due = match now_ms.checked_add(1) {
            Some(bound) => {
                let pending = self.entries.split_off(&(bound, TimerId(0)));
                std::mem::replace(&mut self.entries, pending)
            }
            None => std::mem::take(&mut self.entries),
        };
        due.into_values().collect()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<u64> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Number of pending tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tasks are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending task.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_due_in_deadline_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(300, "c");
        timers.schedule(100, "a");
        timers.schedule(200, "b");
        timers.schedule(900, "late");

        assert_eq!(timers.drain_due(300), vec!["a", "b", "c"]);
        assert_eq!(timers.len(), 1);
        assert_eq!(timers.next_deadline(), Some(900));
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let mut timers = TimerQueue::new();
        timers.schedule(500, 1);
        assert!(timers.drain_due(499).is_empty());
        assert_eq!(timers.drain_due(500), vec![1]);
    }

    #[test]
    fn test_cancel() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(100, "gone");
        timers.schedule(100, "kept");

        assert_eq!(timers.cancel(id), Some("gone"));
        assert_eq!(timers.cancel(id), None);
        assert_eq!(timers.drain_due(1000), vec!["kept"]);
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(10, "first");
        timers.schedule(10, "second");
        assert_eq!(timers.drain_due(10), vec!["first", "second"]);
    }

    #[test]
    fn test_drain_at_max_time() {
        let mut timers = TimerQueue::new();
        timers.schedule(u64::MAX, "end");
        assert_eq!(timers.drain_due(u64::MAX), vec!["end"]);
    }

    #[test]
    fn test_clear() {
        let mut timers = TimerQueue::new();
        timers.schedule(1, ());
        timers.clear();
        assert!(timers.is_empty());
        assert_eq!(timers.next_deadline(), None);
    }
}
