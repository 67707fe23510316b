//! The application state and the feature dispatcher.
//!
//! `App` owns every feature module, the scheduler and the wall clock. It is
//! single-threaded: the runtime wraps it in a mutex and drives it with
//! `advance`, while hosts call the feature operations in between.

use crate::common::{AlarmId, Feature, TaskId};
use crate::components::alarm::{Alarm, AlarmManager};
use crate::components::stopwatch::{Lap, Stopwatch};
use crate::components::timer::{Timer, TimerInput, TimerTick};
use crate::components::weather::{self, WeatherPanel, WeatherSnapshot};
use crate::config::TiltclockConfig;
use crate::error::Result;
use crate::events::{AppEvent, Effect, Severity};
use crate::format;
use crate::orientation::{Orientation, OrientationChange, OrientationTracker, ViewportSignal};
use crate::scheduler::{Due, Scheduler, TickSource};
use crate::storage::KeyValueStore;
use crate::time::WallClock;
use chrono::NaiveTime;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

/// Short haptic tap for button presses.
const TAP: [u64; 1] = [50];

/// Which orientation was last classified and which panel it selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppState {
    pub orientation: Option<Orientation>,
    pub active: Feature,
}

/// The clock panel text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockDisplay {
    pub time: String,
    pub date: String,
}

pub struct App {
    state: AppState,
    tracker: OrientationTracker,
    settle_delay: Duration,
    latest_signal: Option<ViewportSignal>,
    clock_tick: Duration,
    clock_task: Option<TaskId>,
    clock: ClockDisplay,
    wall_clock: Arc<dyn WallClock>,
    scheduler: Scheduler,
    alarms: AlarmManager,
    stopwatch: Stopwatch,
    timer: Timer,
    weather: WeatherPanel,
    weather_requests: Vec<u64>,
    next_weather_request: u64,
    event_sender: broadcast::Sender<AppEvent>,
    effect_sender: broadcast::Sender<Effect>,
}

// Core implementation block for tick routing and panel switching.
impl App {
    pub fn new(
        config: &TiltclockConfig,
        wall_clock: Arc<dyn WallClock>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (effect_sender, _) = broadcast::channel(64);

        Self {
            state: AppState {
                orientation: None,
                active: Feature::Alarm,
            },
            tracker: OrientationTracker::new(config.orientation.landscape_threshold),
            settle_delay: config.orientation.settle_delay(),
            latest_signal: None,
            clock_tick: Duration::from_millis(config.clock.tick_ms),
            clock_task: None,
            clock: ClockDisplay::default(),
            wall_clock,
            scheduler: Scheduler::new(),
            alarms: AlarmManager::new(
                store,
                config.alarm.storage_key.clone(),
                config.alarm.effect_duration(),
            ),
            stopwatch: Stopwatch::new(Duration::from_millis(config.stopwatch.tick_ms)),
            timer: Timer::new(
                Duration::from_millis(config.timer.tick_ms),
                config.timer.effect_duration(),
                TimerInput::new(config.timer.default_minutes, config.timer.default_seconds),
            ),
            weather: WeatherPanel::default(),
            weather_requests: Vec::new(),
            next_weather_request: 0,
            event_sender,
            effect_sender,
        }
    }

    /// Loads alarms, arms the global clock tick and classifies the initial
    /// viewport without waiting for the settle delay.
    pub fn start(&mut self, initial: ViewportSignal) {
        info!("tiltclock starting up");
        self.alarms.load();
        if self.clock_task.is_none() {
            self.clock_task = Some(
                self.scheduler
                    .schedule_every(TickSource::Clock, self.clock_tick),
            );
        }
        self.refresh_clock();
        if self.apply_signal(initial).is_none() {
            // Same orientation as before; still make sure a panel is shown.
            self.activate(self.state.active);
        }
    }

    /// Advances virtual time by `by`, running every due tick in order.
    pub fn advance(&mut self, by: Duration) {
        let until = self.scheduler.now() + by;
        while let Some(due) = self.scheduler.pop_due(until) {
            self.dispatch(due);
        }
    }

    fn dispatch(&mut self, due: Due) {
        trace!(source = ?due.source, at = ?due.at, "tick");
        match due.source {
            TickSource::Clock => self.on_clock_tick(),
            TickSource::Stopwatch => self.stopwatch.on_tick(),
            TickSource::Timer => self.on_timer_tick(),
            TickSource::TimerEffectEnd => self.timer.on_effect_end(),
            TickSource::OrientationSettle => {
                if let Some(signal) = self.latest_signal {
                    self.apply_signal(signal);
                }
            }
        }
    }

    /// Records a rotation. Every report arms its own settle task and none is
    /// ever cancelled; each firing classifies the most recent report, so a
    /// steady stream of reports still gets classified every settle period.
    pub fn report_viewport(&mut self, signal: ViewportSignal) {
        debug!(?signal, "viewport reported");
        self.latest_signal = Some(signal);
        self.scheduler
            .schedule_once(TickSource::OrientationSettle, self.settle_delay);
    }

    /// Classifies immediately. Returns the change, if any.
    pub fn apply_signal(&mut self, signal: ViewportSignal) -> Option<OrientationChange> {
        let change = self.tracker.observe(signal)?;
        info!(from = ?change.from, to = %change.to, "orientation changed");
        self.state.orientation = Some(change.to);
        self.event_sender
            .send(AppEvent::OrientationChanged {
                from: change.from,
                to: change.to,
            })
            .ok();
        self.activate(change.to.feature());
        Some(change)
    }

    /// Deactivates every panel and activates exactly `feature`.
    fn activate(&mut self, feature: Feature) {
        self.state.active = feature;
        info!(%feature, "panel activated");
        self.event_sender
            .send(AppEvent::FeatureActivated { feature })
            .ok();
        if feature == Feature::Weather {
            self.request_weather_refresh();
        }
    }

    fn on_clock_tick(&mut self) {
        let now = self.refresh_clock();
        for alarm in self.alarms.check_alarms(now) {
            self.event_sender
                .send(AppEvent::AlarmTriggered {
                    id: alarm.id,
                    time: alarm.label(),
                })
                .ok();
            let effects = self.alarms.trigger_effects(&alarm);
            self.emit(effects);
        }
    }

    fn refresh_clock(&mut self) -> NaiveTime {
        let now = self.wall_clock.now();
        self.clock = ClockDisplay {
            time: format::clock_time(now),
            date: format::clock_date(now),
        };
        self.event_sender
            .send(AppEvent::ClockTick {
                time: self.clock.time.clone(),
                date: self.clock.date.clone(),
            })
            .ok();
        now.time()
    }

    fn on_timer_tick(&mut self) {
        match self.timer.on_tick(&mut self.scheduler) {
            Some(TimerTick::Counting { remaining_ms }) => {
                self.event_sender
                    .send(AppEvent::TimerTick { remaining_ms })
                    .ok();
            }
            Some(TimerTick::Completed) => {
                self.event_sender
                    .send(AppEvent::TimerTick { remaining_ms: 0 })
                    .ok();
                self.event_sender.send(AppEvent::TimerCompleted).ok();
                let effects = self.timer.completion_effects();
                self.emit(effects);
            }
            None => {}
        }
    }

    fn emit(&self, effects: Vec<Effect>) {
        for effect in effects {
            self.effect_sender.send(effect).ok();
        }
    }
}

// Public API implementation block.
impl App {
    pub fn state(&self) -> AppState {
        self.state
    }

    pub fn is_active(&self, feature: Feature) -> bool {
        self.state.active == feature
    }

    pub fn clock(&self) -> &ClockDisplay {
        &self.clock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<AppEvent> {
        self.event_sender.subscribe()
    }

    pub fn subscribe_effects(&self) -> broadcast::Receiver<Effect> {
        self.effect_sender.subscribe()
    }

    pub fn event_sender(&self) -> &broadcast::Sender<AppEvent> {
        &self.event_sender
    }

    pub fn effect_sender(&self) -> &broadcast::Sender<Effect> {
        &self.effect_sender
    }

    // --- Alarms ---

    pub fn add_alarm(&mut self, time: NaiveTime) -> Result<Alarm> {
        let alarm = self.alarms.add_alarm(time)?;
        self.event_sender
            .send(AppEvent::AlarmAdded {
                id: alarm.id,
                time: alarm.label(),
            })
            .ok();
        Ok(alarm)
    }

    pub fn delete_alarm(&mut self, id: AlarmId) -> Result<bool> {
        let deleted = self.alarms.delete_alarm(id)?;
        if deleted {
            self.event_sender.send(AppEvent::AlarmDeleted { id }).ok();
        }
        Ok(deleted)
    }

    pub fn toggle_alarm(&mut self, id: AlarmId) -> Result<Option<bool>> {
        self.alarms.toggle_alarm(id)
    }

    pub fn alarms(&self) -> &AlarmManager {
        &self.alarms
    }

    // --- Stopwatch ---

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn stopwatch_start(&mut self) -> bool {
        let started = self.stopwatch.start(&mut self.scheduler);
        if started {
            self.emit(vec![Effect::Vibrate(TAP.to_vec())]);
        }
        started
    }

    pub fn stopwatch_pause(&mut self) -> bool {
        self.stopwatch.pause(&mut self.scheduler)
    }

    pub fn stopwatch_reset(&mut self) {
        self.stopwatch.reset(&mut self.scheduler);
    }

    pub fn stopwatch_lap(&mut self) -> Option<Lap> {
        let lap = self.stopwatch.lap()?;
        self.event_sender
            .send(AppEvent::LapRecorded {
                number: lap.number,
                elapsed_ms: lap.elapsed_ms,
            })
            .ok();
        self.emit(vec![Effect::Vibrate(TAP.to_vec())]);
        Some(lap)
    }

    // --- Timer ---

    pub fn timer(&self) -> &Timer {
        &self.timer
    }

    pub fn timer_set_input(&mut self, minutes: u32, seconds: u32) {
        self.timer.set_input(TimerInput::new(minutes, seconds));
    }

    pub fn timer_preset(&mut self, total_secs: u64) {
        self.timer.apply_preset(total_secs);
    }

    /// Starts the countdown. A zero duration is rejected with a warning
    /// notification and no state change.
    pub fn timer_start(&mut self) -> Result<()> {
        if let Err(e) = self.timer.start(&mut self.scheduler) {
            self.emit(vec![Effect::notify(
                "Timer",
                "Please set a time first",
                "warning",
                Severity::Warning,
            )]);
            return Err(e);
        }
        self.emit(vec![Effect::Vibrate(TAP.to_vec())]);
        Ok(())
    }

    pub fn timer_pause(&mut self) -> bool {
        self.timer.pause(&mut self.scheduler)
    }

    pub fn timer_reset(&mut self) {
        self.timer.reset(&mut self.scheduler);
    }

    // --- Weather ---

    pub fn weather(&self) -> &WeatherPanel {
        &self.weather
    }

    /// Queues a weather refresh and shows the loading state. Returns the
    /// request number. In-flight requests are neither cancelled nor merged.
    pub fn request_weather_refresh(&mut self) -> u64 {
        self.next_weather_request += 1;
        let request = self.next_weather_request;
        self.weather = WeatherPanel::Loading;
        self.weather_requests.push(request);
        debug!(request, "weather refresh queued");
        self.event_sender
            .send(AppEvent::WeatherRequested { request })
            .ok();
        request
    }

    /// Drains queued refresh requests for the runtime to execute.
    pub fn take_weather_requests(&mut self) -> Vec<u64> {
        std::mem::take(&mut self.weather_requests)
    }

    /// Applies a finished fetch. Results land in completion order.
    pub fn apply_weather(&mut self, request: u64, result: Result<WeatherSnapshot>) {
        match result {
            Ok(snapshot) => {
                let effects = weather::success_effects(&snapshot);
                self.weather = WeatherPanel::Ready(snapshot.clone());
                self.event_sender
                    .send(AppEvent::WeatherUpdated { request, snapshot })
                    .ok();
                self.emit(effects);
            }
            Err(e) => {
                let effects = weather::failure_effects(&e);
                self.weather = WeatherPanel::Failed {
                    reason: e.to_string(),
                };
                self.event_sender
                    .send(AppEvent::WeatherFailed {
                        request,
                        reason: e.to_string(),
                    })
                    .ok();
                self.emit(effects);
            }
        }
    }
}
