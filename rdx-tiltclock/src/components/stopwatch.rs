//! Stopwatch engine: fixed-tick accumulation with lap capture.

use crate::common::TaskId;
use crate::format;
use crate::scheduler::{Scheduler, TickSource};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopwatchStatus {
    Stopped,
    Running,
}

/// A captured lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lap {
    /// 1-based.
    pub number: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
pub struct Stopwatch {
    tick: Duration,
    elapsed_ms: u64,
    laps: Vec<u64>,
    /// Armed tick while running.
    task: Option<TaskId>,
}

impl Stopwatch {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            elapsed_ms: 0,
            laps: Vec::new(),
            task: None,
        }
    }

    pub fn status(&self) -> StopwatchStatus {
        if self.task.is_some() {
            StopwatchStatus::Running
        } else {
            StopwatchStatus::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Starts or resumes. Returns `false` if already running.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> bool {
        if self.task.is_some() {
            return false;
        }
        self.task = Some(scheduler.schedule_every(TickSource::Stopwatch, self.tick));
        info!(elapsed_ms = self.elapsed_ms, "stopwatch started");
        true
    }

    /// Halts the tick and keeps the elapsed time. Returns `false` if not running.
    pub fn pause(&mut self, scheduler: &mut Scheduler) -> bool {
        let Some(task) = self.task.take() else {
            return false;
        };
        scheduler.cancel(task);
        info!(elapsed_ms = self.elapsed_ms, "stopwatch paused");
        true
    }

    /// Stops and clears elapsed time and laps.
    pub fn reset(&mut self, scheduler: &mut Scheduler) {
        if let Some(task) = self.task.take() {
            scheduler.cancel(task);
        }
        self.elapsed_ms = 0;
        self.laps.clear();
        info!("stopwatch reset");
    }

    /// Accumulates one tick. Ignored when stopped.
    pub fn on_tick(&mut self) {
        if self.task.is_some() {
            self.elapsed_ms += self.tick.as_millis() as u64;
        }
    }

    /// Captures the current elapsed time. Only accepted while running.
    pub fn lap(&mut self) -> Option<Lap> {
        if self.task.is_none() {
            debug!("lap ignored, stopwatch not running");
            return None;
        }
        self.laps.push(self.elapsed_ms);
        let lap = Lap {
            number: self.laps.len(),
            elapsed_ms: self.elapsed_ms,
        };
        info!(number = lap.number, elapsed_ms = lap.elapsed_ms, "lap recorded");
        Some(lap)
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn laps(&self) -> &[u64] {
        &self.laps
    }

    /// Time between consecutive laps; the first split is measured from zero.
    pub fn splits(&self) -> Vec<u64> {
        let mut previous = 0;
        self.laps
            .iter()
            .map(|&lap| {
                let split = lap - previous;
                previous = lap;
                split
            })
            .collect()
    }

    pub fn display(&self) -> String {
        format::stopwatch(self.elapsed_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(stopwatch: &mut Stopwatch, scheduler: &mut Scheduler, by: Duration) {
        for due in scheduler.advance(by) {
            if due.source == TickSource::Stopwatch {
                stopwatch.on_tick();
            }
        }
    }

    #[test]
    fn elapsed_is_ten_ms_per_tick() {
        let mut scheduler = Scheduler::new();
        let mut stopwatch = Stopwatch::new(Duration::from_millis(10));

        assert!(stopwatch.start(&mut scheduler));
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(1234));
        assert!(stopwatch.pause(&mut scheduler));
        assert_eq!(stopwatch.elapsed_ms(), 1230);
        assert_eq!(stopwatch.display(), "00:00:01.23");

        // Paused time does not accumulate.
        run(&mut stopwatch, &mut scheduler, Duration::from_secs(3));
        assert_eq!(stopwatch.elapsed_ms(), 1230);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn resume_continues_from_paused_value() {
        let mut scheduler = Scheduler::new();
        let mut stopwatch = Stopwatch::new(Duration::from_millis(10));
        stopwatch.start(&mut scheduler);
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(500));
        stopwatch.pause(&mut scheduler);
        stopwatch.start(&mut scheduler);
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(500));
        assert_eq!(stopwatch.elapsed_ms(), 1000);
        assert!(!stopwatch.start(&mut scheduler));
    }

    #[test]
    fn laps_only_while_running() {
        let mut scheduler = Scheduler::new();
        let mut stopwatch = Stopwatch::new(Duration::from_millis(10));
        assert!(stopwatch.lap().is_none());

        stopwatch.start(&mut scheduler);
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(300));
        assert_eq!(stopwatch.lap(), Some(Lap { number: 1, elapsed_ms: 300 }));
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(450));
        assert_eq!(stopwatch.lap().map(|l| l.number), Some(2));
        assert_eq!(stopwatch.laps(), &[300, 750]);
        assert_eq!(stopwatch.splits(), vec![300, 450]);

        stopwatch.pause(&mut scheduler);
        assert!(stopwatch.lap().is_none());
        assert_eq!(stopwatch.laps().len(), 2);
    }

    #[test]
    fn reset_clears_everything_from_any_state() {
        let mut scheduler = Scheduler::new();
        let mut stopwatch = Stopwatch::new(Duration::from_millis(10));
        stopwatch.start(&mut scheduler);
        run(&mut stopwatch, &mut scheduler, Duration::from_millis(200));
        stopwatch.lap();

        stopwatch.reset(&mut scheduler);
        assert_eq!(stopwatch.status(), StopwatchStatus::Stopped);
        assert_eq!(stopwatch.elapsed_ms(), 0);
        assert!(stopwatch.laps().is_empty());
        assert!(scheduler.is_empty());

        stopwatch.reset(&mut scheduler);
        assert_eq!(stopwatch.elapsed_ms(), 0);
    }
}
