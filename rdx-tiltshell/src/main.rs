use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tiltclock::prelude::*;
use tiltclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Timer preset buttons, in seconds.
const PRESETS: [u64; 4] = [60, 180, 300, 600];

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

/// Everything the shell can do, parsed from one input line.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Rotate(ViewportSignal),
    Show,
    AlarmAdd(String),
    AlarmDelete(AlarmId),
    AlarmToggle(AlarmId),
    AlarmList,
    StopwatchStart,
    StopwatchPause,
    StopwatchReset,
    StopwatchLap,
    TimerSet { minutes: u32, seconds: u32 },
    TimerPreset(u64),
    TimerStart,
    TimerPause,
    TimerReset,
    WeatherRefresh,
    Ticks(bool),
    Help,
    Exit,
    Nothing,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let args = line.split_whitespace().collect::<Vec<_>>();
    let Some(command) = args.first() else {
        return Ok(Command::Nothing);
    };
    let number = |idx: usize, what: &str| -> Result<u64, String> {
        let raw = args.get(idx).ok_or_else(|| format!("missing {}", what))?;
        raw.parse::<u64>()
            .map_err(|_| format!("'{}' is not a valid {}", raw, what))
    };
    let small = |idx: usize, what: &str| -> Result<u32, String> {
        u32::try_from(number(idx, what)?).map_err(|_| format!("{} is too large", what))
    };

    match *command {
        "rotate" => {
            let width = small(1, "width")?;
            let height = small(2, "height")?;
            let angle = match args.get(3) {
                Some(raw) => Some(
                    raw.parse::<i16>()
                        .map_err(|_| format!("'{}' is not a valid angle", raw))?,
                ),
                None => None,
            };
            Ok(Command::Rotate(ViewportSignal::new(width, height, angle)))
        }
        "up" => Ok(Command::Rotate(ViewportSignal::new(390, 844, Some(0)))),
        "down" => Ok(Command::Rotate(ViewportSignal::new(390, 700, Some(180)))),
        "right" => Ok(Command::Rotate(ViewportSignal::new(844, 390, Some(90)))),
        "left" => Ok(Command::Rotate(ViewportSignal::new(700, 390, Some(-90)))),
        "show" => Ok(Command::Show),
        "alarm" => match args.get(1).copied() {
            Some("add") => args
                .get(2)
                .map(|t| Command::AlarmAdd(t.to_string()))
                .ok_or_else(|| "Usage: alarm add <HH:MM>".to_string()),
            Some("del") => Ok(Command::AlarmDelete(AlarmId(number(2, "alarm id")?))),
            Some("toggle") => Ok(Command::AlarmToggle(AlarmId(number(2, "alarm id")?))),
            Some("list") | None => Ok(Command::AlarmList),
            Some(other) => Err(format!("Unknown 'alarm' command '{}'.", other)),
        },
        "sw" => match args.get(1).copied() {
            Some("start") => Ok(Command::StopwatchStart),
            Some("pause") => Ok(Command::StopwatchPause),
            Some("reset") => Ok(Command::StopwatchReset),
            Some("lap") => Ok(Command::StopwatchLap),
            _ => Err("Usage: sw start|pause|reset|lap".to_string()),
        },
        "timer" => match args.get(1).copied() {
            Some("set") => Ok(Command::TimerSet {
                minutes: small(2, "minutes")?,
                seconds: match args.get(3) {
                    Some(_) => small(3, "seconds")?,
                    None => 0,
                },
            }),
            Some("preset") => {
                let slot = number(2, "preset")? as usize;
                PRESETS
                    .get(slot.wrapping_sub(1))
                    .map(|secs| Command::TimerPreset(*secs))
                    .ok_or_else(|| format!("Presets are 1..={}.", PRESETS.len()))
            }
            Some("start") => Ok(Command::TimerStart),
            Some("pause") => Ok(Command::TimerPause),
            Some("reset") => Ok(Command::TimerReset),
            _ => Err("Usage: timer set <M> [S] | preset <N> | start | pause | reset".to_string()),
        },
        "weather" => Ok(Command::WeatherRefresh),
        "ticks" => match args.get(1).copied() {
            Some("on") => Ok(Command::Ticks(true)),
            Some("off") => Ok(Command::Ticks(false)),
            _ => Err("Usage: ticks on|off".to_string()),
        },
        "help" => Ok(Command::Help),
        "exit" => Ok(Command::Exit),
        _ => Err(format!("Unknown command: '{}'. Type 'help'.", line.trim())),
    }
}

/// Reads the logo file and prints the banner.
fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );

    println!("{}", "-----------------------------------------------------------------".dimmed());

    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());

    println!("{}", "-----------------------------------------------------------------".dimmed());
}

/// Spawns several tasks, each subscribing to a different event stream from the engine.
fn spawn_event_listeners(engine: &TiltclockEngine, is_listening_to_ticks: Arc<AtomicBool>) {
    let mut app_rx = engine.subscribe_app_events();
    tokio::spawn(async move {
        while let Ok(event) = app_rx.recv().await {
            match event {
                AppEvent::ClockTick { time, .. } => {
                    if is_listening_to_ticks.load(Ordering::Relaxed) {
                        println!("<-- [CLOCK] {}", time);
                    }
                }
                AppEvent::TimerTick { .. } => {}
                AppEvent::FeatureActivated { feature } => {
                    println!("\n<-- [PANEL] {}\n>> ", feature.to_string().green().bold());
                }
                other => println!("\n<-- [EVENT] {:?}\n>> ", other),
            }
        }
    });

    let mut effect_rx = engine.subscribe_effects();
    tokio::spawn(async move {
        while let Ok(effect) = effect_rx.recv().await {
            let line = match effect {
                Effect::Notify {
                    title,
                    body,
                    severity,
                    ..
                } => {
                    let text = format!("[{}] {}", title, body);
                    match severity {
                        Severity::Error => text.red().bold(),
                        Severity::Warning => text.yellow().bold(),
                        Severity::Success => text.green(),
                        Severity::Info => text.cyan(),
                    }
                    .to_string()
                }
                Effect::Vibrate(pattern) => format!("bzzt {:?}", pattern).dimmed().to_string(),
                Effect::Chime => "*ding*".magenta().to_string(),
                Effect::Pulse { feature, duration } => {
                    format!("({} pulses for {:?})", feature, duration).dimmed().to_string()
                }
            };
            println!("\n<-- {}\n>> ", line);
        }
    });
}

/// Renders the active panel as text.
fn render(app: &App) -> String {
    let state = app.state();
    let orientation = state
        .orientation
        .map(|o| o.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let mut out = format!(
        "{} ({})\n",
        state.active.to_string().to_uppercase().green().bold(),
        orientation.dimmed()
    );
    match state.active {
        Feature::Alarm => {
            out.push_str(&format!("  {}\n  {}\n", app.clock().time.bold(), app.clock().date));
            for alarm in app.alarms().sorted() {
                let flag = if alarm.active { "on ".green() } else { "off".dimmed() };
                out.push_str(&format!("  {} {} [{}]\n", alarm.id, alarm.label(), flag));
            }
        }
        Feature::Stopwatch => {
            let stopwatch = app.stopwatch();
            out.push_str(&format!("  {} ({:?})\n", stopwatch.display().bold(), stopwatch.status()));
            for (i, (lap, split)) in stopwatch.laps().iter().zip(stopwatch.splits()).enumerate() {
                out.push_str(&format!(
                    "  Lap {:>2}  {}  +{}\n",
                    i + 1,
                    tiltclock::format::stopwatch(*lap),
                    tiltclock::format::stopwatch(split)
                ));
            }
        }
        Feature::Timer => {
            let timer = app.timer();
            let input = timer.input();
            out.push_str(&format!(
                "  {} ({:?})  input {}m {}s\n",
                timer.display().bold(),
                timer.status(),
                input.minutes,
                input.seconds
            ));
        }
        Feature::Weather => {
            for (label, value) in app.weather().rows() {
                out.push_str(&format!("  {:<12} {}\n", label, value));
            }
            if let WeatherPanel::Failed { reason } = app.weather() {
                out.push_str(&format!("  {}\n", reason.red()));
            }
        }
    }
    out
}

async fn execute(engine: &TiltclockEngine, command: Command, ticks: &AtomicBool) -> bool {
    match command {
        Command::Rotate(signal) => {
            engine.report_viewport(signal).await;
            println!("--> Rotated to {}x{} (angle {:?}).", signal.width, signal.height, signal.angle);
        }
        Command::Show => println!("{}", engine.view(render).await),
        Command::AlarmAdd(raw) => match parse_time_of_day(&raw) {
            Ok(time) => match engine.update(|app| app.add_alarm(time)).await {
                Ok(alarm) => println!("--> Alarm {} set for {}.", alarm.id, alarm.label()),
                Err(e) => println!("Error: {}", e),
            },
            Err(e) => println!("Error: {}", e),
        },
        Command::AlarmDelete(id) => match engine.update(|app| app.delete_alarm(id)).await {
            Ok(true) => println!("--> Alarm {} deleted.", id),
            Ok(false) => println!("--> No alarm {}.", id),
            Err(e) => println!("Error: {}", e),
        },
        Command::AlarmToggle(id) => match engine.update(|app| app.toggle_alarm(id)).await {
            Ok(Some(active)) => println!("--> Alarm {} is now {}.", id, if active { "on" } else { "off" }),
            Ok(None) => println!("--> No alarm {}.", id),
            Err(e) => println!("Error: {}", e),
        },
        Command::AlarmList => {
            let alarms = engine
                .view(|app| {
                    app.alarms()
                        .sorted()
                        .into_iter()
                        .map(|a| (a.id, a.label(), a.active))
                        .collect::<Vec<_>>()
                })
                .await;
            println!("Alarms:");
            for (id, label, active) in alarms {
                println!("  {} {} {}", id, label, if active { "on" } else { "off" });
            }
        }
        Command::StopwatchStart => {
            if !engine.update(|app| app.stopwatch_start()).await {
                println!("--> Stopwatch is already running.");
            }
        }
        Command::StopwatchPause => {
            let shown = engine
                .update(|app| app.stopwatch_pause().then(|| app.stopwatch().display()))
                .await;
            match shown {
                Some(display) => println!("--> Paused at {}.", display),
                None => println!("--> Stopwatch is not running."),
            }
        }
        Command::StopwatchReset => engine.update(|app| app.stopwatch_reset()).await,
        Command::StopwatchLap => match engine.update(|app| app.stopwatch_lap()).await {
            Some(lap) => println!(
                "--> Lap {}: {}",
                lap.number,
                tiltclock::format::stopwatch(lap.elapsed_ms)
            ),
            None => println!("--> Laps are only recorded while running."),
        },
        Command::TimerSet { minutes, seconds } => {
            engine.update(|app| app.timer_set_input(minutes, seconds)).await;
        }
        Command::TimerPreset(secs) => {
            engine.update(|app| app.timer_preset(secs)).await;
            println!("--> Timer preset to {}.", tiltclock::format::countdown(secs * 1000));
        }
        Command::TimerStart => {
            if let Err(e) = engine.update(|app| app.timer_start()).await {
                println!("Error: {}", e);
            }
        }
        Command::TimerPause => {
            if !engine.update(|app| app.timer_pause()).await {
                println!("--> Timer is not running.");
            }
        }
        Command::TimerReset => engine.update(|app| app.timer_reset()).await,
        Command::WeatherRefresh => {
            let request = engine.refresh_weather().await;
            println!("--> Weather request #{} sent.", request);
        }
        Command::Ticks(on) => {
            ticks.store(on, Ordering::Relaxed);
            println!("--> Clock ticks {}.", if on { "shown" } else { "hidden" });
        }
        Command::Help => print_help(),
        Command::Exit => return false,
        Command::Nothing => {}
    }
    true
}

fn print_help() {
    println!("Available commands:");
    println!("  rotate <W> <H> [ANGLE] - Reports a viewport (switches panels after settling).");
    println!("  up | right | down | left - Rotates to a preset orientation.");
    println!("  show                   - Renders the active panel.");
    println!("  alarm add <HH:MM>      - Adds an alarm.");
    println!("  alarm del <ID>         - Deletes an alarm.");
    println!("  alarm toggle <ID>      - Arms or disarms an alarm.");
    println!("  alarm list             - Lists alarms.");
    println!("  sw start|pause|reset|lap - Controls the stopwatch.");
    println!("  timer set <M> [S]      - Sets the timer input fields.");
    println!("  timer preset <1-4>     - 1, 3, 5 or 10 minutes.");
    println!("  timer start|pause|reset - Controls the timer.");
    println!("  weather                - Refreshes the weather.");
    println!("  ticks on|off           - Shows or hides clock ticks.");
    println!("  exit                   - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = TiltclockConfig::load(None)?;
    let engine = TiltclockEngine::new(config);
    let engine_handle = engine.clone();

    let is_listening_to_ticks = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(&engine_handle, is_listening_to_ticks.clone());

    info!("Spawning {} in the background...", ENGINE_NAME);
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl = Editor::new()?;
    rl.set_helper(Some(MyHighlighter {}));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                match parse_command(&line) {
                    Ok(command) => {
                        if !execute(&engine_handle, command, &is_listening_to_ticks).await {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
            Err(_) => {
                println!("Exiting tiltshell...");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rotation_with_and_without_angle() {
        assert_eq!(
            parse_command("rotate 844 390 90"),
            Ok(Command::Rotate(ViewportSignal::new(844, 390, Some(90))))
        );
        assert_eq!(
            parse_command("rotate 1280 720"),
            Ok(Command::Rotate(ViewportSignal::new(1280, 720, None)))
        );
        assert!(parse_command("rotate wide 390").is_err());
    }

    #[test]
    fn parses_feature_commands() {
        assert_eq!(parse_command("alarm add 07:00"), Ok(Command::AlarmAdd("07:00".into())));
        assert_eq!(parse_command("alarm del 3"), Ok(Command::AlarmDelete(AlarmId(3))));
        assert_eq!(parse_command("sw lap"), Ok(Command::StopwatchLap));
        assert_eq!(
            parse_command("timer set 1 30"),
            Ok(Command::TimerSet { minutes: 1, seconds: 30 })
        );
        assert_eq!(
            parse_command("timer set 5"),
            Ok(Command::TimerSet { minutes: 5, seconds: 0 })
        );
        assert!(parse_command("timer set 1 abc").is_err());
        assert_eq!(parse_command("timer preset 2"), Ok(Command::TimerPreset(180)));
        assert!(parse_command("timer preset 9").is_err());
        assert!(parse_command("timer preset 0").is_err());
        assert_eq!(parse_command("   "), Ok(Command::Nothing));
    }
}
