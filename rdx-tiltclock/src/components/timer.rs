//! Countdown timer engine.
//!
//! Stopped -> Running -> Completed -> Stopped. Completed is transient: it
//! lasts as long as the completion effect and then collapses back to
//! Stopped on its own.

use crate::common::{Feature, TaskId};
use crate::error::{Result, TiltError};
use crate::events::{Effect, Severity};
use crate::format;
use crate::scheduler::{Scheduler, TickSource};
use std::time::Duration;
use tracing::{info, warn};

/// Vibration pattern played on completion.
pub const TIMER_VIBRATION: [u64; 3] = [1000, 500, 1000];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerStatus {
    Stopped,
    Running,
    Completed,
}

/// The minutes/seconds input fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerInput {
    pub minutes: u32,
    /// Clamped to 0..=59.
    pub seconds: u32,
}

impl TimerInput {
    pub fn new(minutes: u32, seconds: u32) -> Self {
        Self {
            minutes,
            seconds: seconds.min(59),
        }
    }

    /// Splits a preset length into input fields.
    pub fn from_secs(total: u64) -> Self {
        Self::new(u32::try_from(total / 60).unwrap_or(u32::MAX), (total % 60) as u32)
    }

    pub fn duration_ms(self) -> u64 {
        (u64::from(self.minutes) * 60 + u64::from(self.seconds)) * 1000
    }
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTick {
    Counting { remaining_ms: u64 },
    Completed,
}

#[derive(Debug)]
pub struct Timer {
    tick: Duration,
    effect_duration: Duration,
    input: TimerInput,
    remaining_ms: u64,
    status: TimerStatus,
    /// Countdown tick while running, effect-end one-shot while completed.
    task: Option<TaskId>,
}

impl Timer {
    pub fn new(tick: Duration, effect_duration: Duration, input: TimerInput) -> Self {
        Self {
            tick: tick.max(Duration::from_millis(1)),
            effect_duration,
            input,
            remaining_ms: input.duration_ms(),
            status: TimerStatus::Stopped,
            task: None,
        }
    }

    pub fn status(&self) -> TimerStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn input(&self) -> TimerInput {
        self.input
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn display(&self) -> String {
        format::countdown(self.remaining_ms)
    }

    /// Updates the input fields. While not running, the remaining time is
    /// reset to the new configured duration.
    pub fn set_input(&mut self, input: TimerInput) {
        self.input = input;
        if !self.is_running() {
            self.remaining_ms = input.duration_ms();
        }
    }

    /// Fills the input fields from a preset length.
    pub fn apply_preset(&mut self, total_secs: u64) {
        self.set_input(TimerInput::from_secs(total_secs));
    }

    /// Starts or resumes the countdown.
    ///
    /// Rejected with `InvalidConfiguration` when nothing remains; the state
    /// does not change. Starting while running is a no-op.
    pub fn start(&mut self, scheduler: &mut Scheduler) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }
        if self.remaining_ms == 0 {
            warn!("timer start rejected, duration is zero");
            return Err(TiltError::InvalidConfiguration(
                "set a duration before starting the timer".into(),
            ));
        }
        self.clear_task(scheduler);
        self.task = Some(scheduler.schedule_every(TickSource::Timer, self.tick));
        self.status = TimerStatus::Running;
        info!(remaining_ms = self.remaining_ms, "timer started");
        Ok(())
    }

    /// Halts the countdown, keeping the remaining time.
    pub fn pause(&mut self, scheduler: &mut Scheduler) -> bool {
        if !self.is_running() {
            return false;
        }
        self.clear_task(scheduler);
        self.status = TimerStatus::Stopped;
        info!(remaining_ms = self.remaining_ms, "timer paused");
        true
    }

    /// Stops and re-derives the remaining time from the input fields.
    pub fn reset(&mut self, scheduler: &mut Scheduler) {
        self.clear_task(scheduler);
        self.status = TimerStatus::Stopped;
        self.remaining_ms = self.input.duration_ms();
        info!(remaining_ms = self.remaining_ms, "timer reset");
    }

    /// Decrements by one tick. Reaching zero halts the tick, clamps to zero,
    /// enters Completed and arms the end of the completion effect.
    pub fn on_tick(&mut self, scheduler: &mut Scheduler) -> Option<TimerTick> {
        if !self.is_running() {
            return None;
        }
        let step = self.tick.as_millis() as u64;
        if self.remaining_ms > step {
            self.remaining_ms -= step;
            return Some(TimerTick::Counting {
                remaining_ms: self.remaining_ms,
            });
        }
        self.remaining_ms = 0;
        self.clear_task(scheduler);
        self.status = TimerStatus::Completed;
        self.task = Some(scheduler.schedule_once(TickSource::TimerEffectEnd, self.effect_duration));
        info!("timer completed");
        Some(TimerTick::Completed)
    }

    /// The completion effect has finished.
    pub fn on_effect_end(&mut self) {
        if self.status == TimerStatus::Completed {
            self.task = None;
            self.status = TimerStatus::Stopped;
        }
    }

    pub fn completion_effects(&self) -> Vec<Effect> {
        vec![
            Effect::notify("Timer", "Time's up!", "timer", Severity::Info),
            Effect::Chime,
            Effect::Vibrate(TIMER_VIBRATION.to_vec()),
            Effect::Pulse {
                feature: Feature::Timer,
                duration: self.effect_duration,
            },
        ]
    }

    fn clear_task(&mut self, scheduler: &mut Scheduler) {
        if let Some(task) = self.task.take() {
            scheduler.cancel(task);
        }
    }
}
