use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Single-threaded timer queue over a virtual clock.
///
/// Deadlines are offsets from page start. Timers with equal deadlines fire
/// in scheduling order, and a cancelled timer never fires.
#[derive(Debug)]
pub struct TimerQueue<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, TimerId), T>,
    deadlines: HashMap<TimerId, Duration>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn schedule(&mut self, delay: Duration, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let at = self.now + delay;
        self.queue.insert((at, id), task);
        self.deadlines.insert(id, at);
        id
    }

    /// Returns true if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(at) => self.queue.remove(&(at, id)).is_some(),
            None => false,
        }
    }

    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.deadlines.get(&id).copied()
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pops the earliest timer due at or before `until` and moves the clock
    /// to its deadline. Callers loop on this so that continuations scheduled
    /// by a firing timer can themselves fire within the same advance.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, T)> {
        let (&(at, id), _) = self.queue.first_key_value()?;
        if at > until {
            return None;
        }
        let task = self.queue.remove(&(at, id))?;
        self.deadlines.remove(&id);
        self.now = self.now.max(at);
        Some((id, task))
    }

    /// Moves the clock forward. Never moves backwards.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn drain(q: &mut TimerQueue<&'static str>, until: Duration) -> Vec<&'static str> {
        let mut fired = Vec::new();
        while let Some((_, task)) = q.pop_due(until) {
            fired.push(task);
        }
        q.set_now(until);
        fired
    }

    #[test]
    fn fires_in_deadline_then_schedule_order() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::from_millis(30), "late");
        q.schedule(Duration::from_millis(10), "first");
        q.schedule(Duration::from_millis(10), "second");

        assert_eq!(drain(&mut q, Duration::from_millis(20)), vec!["first", "second"]);
        assert_eq!(q.now(), Duration::from_millis(20));
        assert_eq!(drain(&mut q, Duration::from_millis(30)), vec!["late"]);
        assert!(q.is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut q = TimerQueue::new();
        let id = q.schedule(Duration::from_millis(5), "gone");
        assert!(q.is_pending(id));
        assert!(q.cancel(id));
        assert!(!q.cancel(id));
        assert!(drain(&mut q, Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn clock_tracks_fired_deadline() {
        let mut q = TimerQueue::new();
        q.schedule(Duration::from_millis(100), "a");
        let (_, task) = q.pop_due(Duration::from_secs(5)).unwrap();
        assert_eq!(task, "a");
        assert_eq!(q.now(), Duration::from_millis(100));

        let follow = q.schedule(Duration::from_millis(50), "b");
        assert_eq!(q.deadline(follow), Some(Duration::from_millis(150)));
    }

    #[test]
    fn clock_never_runs_backwards() {
        let mut q: TimerQueue<()> = TimerQueue::new();
        q.set_now(Duration::from_secs(2));
        q.set_now(Duration::from_secs(1));
        assert_eq!(q.now(), Duration::from_secs(2));
    }
}
