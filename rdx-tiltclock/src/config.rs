//! Defines all configuration structures for the Tiltclock engine.
//!
//! These structs are deserialized with `serde` and layered by the `config`
//! crate: built-in defaults, then an optional TOML file, then environment
//! variables prefixed with `TILTCLOCK__` (for example
//! `TILTCLOCK__WEATHER__API_KEY`).

use crate::error::Result;
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The default file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tiltclock.toml";

/// The top-level configuration for the `TiltclockEngine`.
#[derive(Debug, Clone, Deserialize)]
pub struct TiltclockConfig {
    /// Period of the runtime ticker that advances the scheduler, in ms.
    #[serde(default = "default_resolution_ms")]
    pub resolution_ms: u64,

    /// The timezone used for the clock panel and alarm matching.
    /// Uses the IANA names (e.g., "Europe/Berlin").
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    #[serde(default)]
    pub orientation: OrientationConfig,

    #[serde(default)]
    pub clock: ClockConfig,

    #[serde(default)]
    pub stopwatch: StopwatchConfig,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub alarm: AlarmConfig,

    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Orientation classification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct OrientationConfig {
    /// Fallback for hosts that never report an angle. A landscape viewport
    /// wider than this counts as landscape-right, a portrait viewport taller
    /// than this counts as portrait-upright. This is an approximation and
    /// can misclassify desktop-sized viewports.
    #[serde(default = "default_landscape_threshold")]
    pub landscape_threshold: u32,

    /// How long to wait after a rotation before classifying it.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// The viewport assumed at startup.
    #[serde(default = "default_initial_width")]
    pub initial_width: u32,
    #[serde(default = "default_initial_height")]
    pub initial_height: u32,
    #[serde(default)]
    pub initial_angle: Option<i16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClockConfig {
    #[serde(default = "default_clock_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StopwatchConfig {
    #[serde(default = "default_stopwatch_tick_ms")]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_timer_tick_ms")]
    pub tick_ms: u64,
    /// How long the completion effect (and the Completed state) lasts.
    #[serde(default = "default_timer_effect_secs")]
    pub effect_secs: u64,
    #[serde(default = "default_timer_minutes")]
    pub default_minutes: u32,
    #[serde(default)]
    pub default_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmConfig {
    /// Directory for the file-backed key-value store.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
    /// The single key holding the JSON alarm array.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_alarm_effect_secs")]
    pub effect_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    /// Endpoint template. `{lat}`, `{lon}`, `{key}` and `{units}` are substituted.
    #[serde(default = "default_weather_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_units")]
    pub units: String,
    #[serde(default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,
    /// Fixed coordinates for hosts without a location service.
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl TiltclockConfig {
    /// Loads the configuration from defaults, an optional file and the environment.
    ///
    /// When `path` is `None`, `tiltclock.toml` in the working directory is used
    /// if it exists.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("TILTCLOCK").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn resolution(&self) -> Duration {
        Duration::from_millis(self.resolution_ms.max(1))
    }
}

impl OrientationConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl TimerConfig {
    pub fn effect_duration(&self) -> Duration {
        Duration::from_secs(self.effect_secs)
    }
}

impl AlarmConfig {
    pub fn effect_duration(&self) -> Duration {
        Duration::from_secs(self.effect_secs)
    }
}

impl WeatherConfig {
    pub fn location_timeout(&self) -> Duration {
        Duration::from_secs(self.location_timeout_secs)
    }
}

// --- Default value functions for serde ---

fn default_resolution_ms() -> u64 {
    10
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_landscape_threshold() -> u32 {
    800
}

fn default_settle_ms() -> u64 {
    100
}

fn default_initial_width() -> u32 {
    390
}

fn default_initial_height() -> u32 {
    844
}

fn default_clock_tick_ms() -> u64 {
    1000
}

fn default_stopwatch_tick_ms() -> u64 {
    10
}

fn default_timer_tick_ms() -> u64 {
    1000
}

fn default_timer_effect_secs() -> u64 {
    3
}

fn default_timer_minutes() -> u32 {
    5
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".tiltclock")
}

fn default_storage_key() -> String {
    "alarms".to_string()
}

fn default_alarm_effect_secs() -> u64 {
    5
}

fn default_weather_endpoint() -> String {
    "https://api.openweathermap.org/data/2.5/weather?lat={lat}&lon={lon}&appid={key}&units={units}"
        .to_string()
}

fn default_units() -> String {
    "metric".to_string()
}

fn default_location_timeout_secs() -> u64 {
    10
}

impl Default for TiltclockConfig {
    fn default() -> Self {
        Self {
            resolution_ms: default_resolution_ms(),
            timezone: default_timezone(),
            orientation: OrientationConfig::default(),
            clock: ClockConfig::default(),
            stopwatch: StopwatchConfig::default(),
            timer: TimerConfig::default(),
            alarm: AlarmConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Default for OrientationConfig {
    fn default() -> Self {
        Self {
            landscape_threshold: default_landscape_threshold(),
            settle_ms: default_settle_ms(),
            initial_width: default_initial_width(),
            initial_height: default_initial_height(),
            initial_angle: None,
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_clock_tick_ms(),
        }
    }
}

impl Default for StopwatchConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_stopwatch_tick_ms(),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_timer_tick_ms(),
            effect_secs: default_timer_effect_secs(),
            default_minutes: default_timer_minutes(),
            default_seconds: 0,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            storage_key: default_storage_key(),
            effect_secs: default_alarm_effect_secs(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_weather_endpoint(),
            api_key: String::new(),
            units: default_units(),
            location_timeout_secs: default_location_timeout_secs(),
            latitude: None,
            longitude: None,
        }
    }
}
