//! # Tiltclock
//!
//! An orientation-switched multi-tool: alarm clock, stopwatch, countdown
//! timer and weather, one per physical device attitude.
//!
//! ## Core Concepts
//!
//! - **Orientation**: Every viewport report is classified into one of four
//!   orientations. Only a *change* in classification switches panels.
//! - **Dispatcher**: Exactly one panel is active at a time, picked by a static
//!   lookup (upright -> alarm clock, landscape-right -> stopwatch,
//!   upside-down -> timer, landscape-left -> weather).
//! - **Scheduler**: All ticks (1 s clock, 10 ms stopwatch, 1 s timer) are
//!   cancelable tasks on one virtual-time `Scheduler`, so a test can replay
//!   any tick sequence deterministically.
//! - **Event-Driven**: State transitions go out as `AppEvent`s; notifications,
//!   vibrations, chimes and pulses go out as best-effort `Effect`s.
//! - **Configuration-Driven**: Tick periods, the orientation threshold,
//!   storage location and weather endpoint come from a `TiltclockConfig`,
//!   usually loaded from `tiltclock.toml`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tiltclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TiltclockConfig::load(None)?;
//!     let engine = TiltclockEngine::new(config);
//!
//!     let mut events = engine.subscribe_app_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Received App Event: {:?}", event);
//!         }
//!     });
//!
//!     // Rotate into landscape-right: the stopwatch panel.
//!     engine.report_viewport(ViewportSignal::new(844, 390, Some(90))).await;
//!     engine.update(|app| app.stopwatch_start()).await;
//!
//!     // Run until Ctrl+C.
//!     engine.run().await?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Tiltclock";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod components;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod orientation;
pub mod scheduler;
pub mod storage;
pub mod time;

/// A prelude module for easy importing of the most common Tiltclock types.
pub mod prelude {
    pub use crate::common::{AlarmId, Feature, TaskId};
    pub use crate::components::alarm::{parse_time_of_day, Alarm};
    pub use crate::components::timer::{TimerInput, TimerStatus};
    pub use crate::components::weather::{WeatherPanel, WeatherSnapshot};
    pub use crate::config::TiltclockConfig;
    pub use crate::dispatcher::{App, AppState};
    pub use crate::engine::TiltclockEngine;
    pub use crate::error::TiltError;
    pub use crate::events::{AppEvent, Effect, Severity, SystemEvent};
    pub use crate::orientation::{Orientation, ViewportSignal};
}
