//! Defines all public event types broadcast by the Tiltclock engine.
//!
//! Two streams exist. `AppEvent` reports state transitions (rotation, panel
//! switches, alarms firing, timer completion, weather results). `Effect`
//! carries the best-effort outputs a host turns into notifications,
//! vibrations, sounds and visual pulses; a host that cannot render one
//! simply ignores it.

use crate::common::{AlarmId, Feature};
use crate::components::weather::WeatherSnapshot;
use crate::orientation::Orientation;
use std::time::Duration;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum SystemEvent {
    /// Fired once when the engine's `run` loop begins.
    EngineStarted { timestamp: Instant },
    /// Fired once when the engine's `run` loop is about to exit.
    EngineShutdown,
    /// A weather fetch task was spawned.
    FetchSpawned { request: u64 },
}

/// State transitions inside the application.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Fired only when the classified orientation differs from the last one.
    OrientationChanged {
        from: Option<Orientation>,
        to: Orientation,
    },
    /// Exactly one panel is active after this event.
    FeatureActivated { feature: Feature },
    /// The global clock refreshed its display.
    ClockTick { time: String, date: String },
    AlarmAdded { id: AlarmId, time: String },
    AlarmDeleted { id: AlarmId },
    AlarmTriggered { id: AlarmId, time: String },
    LapRecorded { number: usize, elapsed_ms: u64 },
    TimerTick { remaining_ms: u64 },
    TimerCompleted,
    /// A weather refresh was requested; `request` numbers them in issue order.
    WeatherRequested { request: u64 },
    WeatherUpdated {
        request: u64,
        snapshot: WeatherSnapshot,
    },
    WeatherFailed { request: u64, reason: String },
}

/// How loud a user-facing notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Best-effort host outputs.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A system notification with title, body and icon key.
    Notify {
        title: String,
        body: String,
        icon: &'static str,
        severity: Severity,
    },
    /// Vibration pattern in milliseconds, alternating on/off.
    Vibrate(Vec<u64>),
    /// An audible chime.
    Chime,
    /// A visual pulse on a panel, bounded in time.
    Pulse { feature: Feature, duration: Duration },
}

impl Effect {
    pub fn notify(
        title: impl Into<String>,
        body: impl Into<String>,
        icon: &'static str,
        severity: Severity,
    ) -> Self {
        Effect::Notify {
            title: title.into(),
            body: body.into(),
            icon,
            severity,
        }
    }
}
