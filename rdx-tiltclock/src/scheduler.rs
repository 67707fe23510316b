//! A virtual-time scheduler for recurring and one-shot ticks.
//!
//! Each feature arms its own task and keeps the returned `TaskId` as a
//! cancelable handle. Time only moves when the owner calls `pop_due`, which
//! makes every tick sequence reproducible in tests. The runtime drives it
//! from a `tokio::time::interval`.

use crate::common::TaskId;
use slotmap::SlotMap;
use std::time::Duration;
use tracing::trace;

/// What a scheduled task is for. The dispatcher routes each firing by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickSource {
    /// Global 1-second clock display refresh and alarm check.
    Clock,
    /// Stopwatch accumulation tick.
    Stopwatch,
    /// Countdown decrement tick.
    Timer,
    /// End of the timer's completion effect.
    TimerEffectEnd,
    /// Post-rotation settle delay has elapsed.
    OrientationSettle,
}

/// A single firing handed back by `pop_due`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Due {
    pub id: TaskId,
    pub source: TickSource,
    /// Virtual time of the firing, measured from scheduler creation.
    pub at: Duration,
}

#[derive(Debug)]
struct ScheduledTask {
    source: TickSource,
    /// `None` for one-shot tasks.
    period: Option<Duration>,
    next_due: Duration,
    /// Registration order, used to break ties.
    seq: u64,
}

/// Owns every armed task and the virtual clock they are measured against.
#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: SlotMap<TaskId, ScheduledTask>,
    now: Duration,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Arms a task that fires every `period`, first at `now + period`.
    pub fn schedule_every(&mut self, source: TickSource, period: Duration) -> TaskId {
        let period = period.max(Duration::from_millis(1));
        self.insert(source, Some(period), period)
    }

    /// Arms a task that fires once after `delay`.
    pub fn schedule_once(&mut self, source: TickSource, delay: Duration) -> TaskId {
        self.insert(source, None, delay)
    }

    fn insert(&mut self, source: TickSource, period: Option<Duration>, delay: Duration) -> TaskId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.tasks.insert(ScheduledTask {
            source,
            period,
            next_due: self.now + delay,
            seq,
        });
        trace!(?id, ?source, ?period, "task armed");
        id
    }

    /// Cancels a task. Returns `true` if it was still armed.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let removed = self.tasks.remove(id).is_some();
        if removed {
            trace!(?id, "task cancelled");
        }
        removed
    }

    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.tasks.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Pops the earliest firing due at or before `until`.
    ///
    /// Virtual time moves to the firing. Recurring tasks re-arm one period
    /// later, one-shot tasks are removed. When nothing else is due, virtual
    /// time moves to `until` and `None` is returned.
    pub fn pop_due(&mut self, until: Duration) -> Option<Due> {
        let next = self
            .tasks
            .iter()
            .filter(|(_, task)| task.next_due <= until)
            .min_by_key(|(_, task)| (task.next_due, task.seq))
            .map(|(id, _)| id);

        let Some(id) = next else {
            self.now = self.now.max(until);
            return None;
        };

        let task = self.tasks.get_mut(id)?;
        let due = Due {
            id,
            source: task.source,
            at: task.next_due,
        };
        let period = task.period;
        if let Some(period) = period {
            task.next_due += period;
        } else {
            self.tasks.remove(id);
        }
        self.now = self.now.max(due.at);
        Some(due)
    }

    /// Convenience for tests and simple owners: collects every firing up to
    /// `now + by`. Cancellations made between firings are not observed.
    pub fn advance(&mut self, by: Duration) -> Vec<Due> {
        let until = self.now + by;
        let mut fired = Vec::new();
        while let Some(due) = self.pop_due(until) {
            fired.push(due);
        }
        fired
    }
}
