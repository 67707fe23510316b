use chrono::{NaiveDate, NaiveDateTime};
use std::sync::Arc;
use std::time::Duration;
use tiltclock::config::TiltclockConfig;
use tiltclock::dispatcher::App;
use tiltclock::events::{AppEvent, Effect};
use tiltclock::prelude::*;
use tiltclock::storage::{FileStore, KeyValueStore, MemoryStore};
use tiltclock::time::ManualWallClock;
use tokio::sync::broadcast;

const UPRIGHT: ViewportSignal = ViewportSignal {
    width: 390,
    height: 844,
    angle: Some(0),
};
const RIGHT: ViewportSignal = ViewportSignal {
    width: 844,
    height: 390,
    angle: Some(90),
};
const UPSIDE_DOWN: ViewportSignal = ViewportSignal {
    width: 390,
    height: 700,
    angle: Some(180),
};
const LEFT: ViewportSignal = ViewportSignal {
    width: 700,
    height: 390,
    angle: Some(-90),
};

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

fn new_app(clock: &ManualWallClock, store: Arc<dyn KeyValueStore>) -> App {
    App::new(&TiltclockConfig::default(), Arc::new(clock.clone()), store)
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut out = Vec::new();
    while let Ok(item) = rx.try_recv() {
        out.push(item);
    }
    out
}

/// Advances both the wall clock and the scheduler one second at a time.
fn run_seconds(app: &mut App, clock: &ManualWallClock, seconds: u32) {
    for _ in 0..seconds {
        clock.advance(chrono::Duration::seconds(1));
        app.advance(Duration::from_secs(1));
    }
}

#[test]
fn every_orientation_activates_exactly_its_panel() {
    let clock = ManualWallClock::new(at(12, 0, 0));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    app.start(UPRIGHT);

    let expected = [
        (RIGHT, Feature::Stopwatch),
        (UPSIDE_DOWN, Feature::Timer),
        (LEFT, Feature::Weather),
        (UPRIGHT, Feature::Alarm),
    ];
    for (signal, feature) in expected {
        app.report_viewport(signal);
        app.advance(Duration::from_millis(100));
        let active: Vec<_> = Feature::ALL.into_iter().filter(|f| app.is_active(*f)).collect();
        assert_eq!(active, vec![feature]);
    }
}

#[test]
fn repeated_signals_do_not_renotify() {
    let clock = ManualWallClock::new(at(12, 0, 0));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    let mut events = app.subscribe_events();
    app.start(UPRIGHT);

    for _ in 0..3 {
        app.report_viewport(RIGHT);
        app.advance(Duration::from_millis(150));
    }
    app.report_viewport(UPRIGHT);
    app.advance(Duration::from_millis(150));

    let changes: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|e| match e {
            AppEvent::OrientationChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            Orientation::PortraitUpright,
            Orientation::LandscapeRight,
            Orientation::PortraitUpright
        ]
    );
}

#[test]
fn only_weather_activation_requests_a_refresh() {
    let clock = ManualWallClock::new(at(12, 0, 0));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    app.start(UPRIGHT);

    for signal in [RIGHT, UPSIDE_DOWN, UPRIGHT] {
        app.report_viewport(signal);
        app.advance(Duration::from_millis(100));
    }
    assert!(app.take_weather_requests().is_empty());

    app.report_viewport(LEFT);
    app.advance(Duration::from_millis(100));
    app.request_weather_refresh();
    // Two requests stay outstanding side by side.
    assert_eq!(app.take_weather_requests(), vec![1, 2]);
}

#[test]
fn alarm_fires_once_at_its_minute() {
    let clock = ManualWallClock::new(at(6, 59, 58));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    app.start(UPRIGHT);
    let mut events = app.subscribe_events();
    let mut effects = app.subscribe_effects();
    app.add_alarm(parse_time_of_day("07:00").unwrap()).unwrap();

    run_seconds(&mut app, &clock, 90);

    let triggered = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, AppEvent::AlarmTriggered { .. }))
        .count();
    assert_eq!(triggered, 1);
    assert!(!app.alarms().alarms()[0].active);

    let effects = drain(&mut effects);
    assert!(effects.contains(&Effect::Chime));
    assert!(effects
        .iter()
        .any(|e| matches!(e, Effect::Notify { title, .. } if title == "Alarm")));
}

#[test]
fn alarm_list_round_trips_through_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualWallClock::new(at(12, 0, 0));

    let mut first = new_app(&clock, Arc::new(FileStore::new(dir.path())));
    first.start(UPRIGHT);
    first.add_alarm(parse_time_of_day("07:00").unwrap()).unwrap();
    drop(first);

    let mut second = new_app(&clock, Arc::new(FileStore::new(dir.path())));
    second.start(UPRIGHT);
    let alarms: Vec<_> = second
        .alarms()
        .alarms()
        .iter()
        .map(|a| (a.label(), a.active))
        .collect();
    assert_eq!(alarms, vec![("07:00".to_string(), true)]);
}

#[test]
fn stopwatch_counts_while_the_panel_is_hidden() {
    let clock = ManualWallClock::new(at(12, 0, 0));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    app.start(RIGHT);
    app.stopwatch_start();

    app.advance(Duration::from_millis(500));
    app.report_viewport(UPRIGHT);
    app.advance(Duration::from_millis(500));
    assert!(app.stopwatch_pause());

    assert_eq!(app.stopwatch().elapsed_ms(), 1000);
    assert_eq!(app.stopwatch().display(), "00:00:01.00");
}

#[test]
fn timer_completes_exactly_once_alongside_the_clock() {
    let clock = ManualWallClock::new(at(12, 0, 0));
    let mut app = new_app(&clock, Arc::new(MemoryStore::new()));
    app.start(UPSIDE_DOWN);
    let mut events = app.subscribe_events();

    app.timer_set_input(1, 30);
    app.timer_start().unwrap();
    run_seconds(&mut app, &clock, 100);

    let completions = drain(&mut events)
        .into_iter()
        .filter(|e| matches!(e, AppEvent::TimerCompleted))
        .count();
    assert_eq!(completions, 1);
    assert_eq!(app.timer().remaining_ms(), 0);
    assert_eq!(app.timer().status(), TimerStatus::Stopped);
}
